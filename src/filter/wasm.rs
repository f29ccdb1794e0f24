//! WASM SIMD128 kernels.
//!
//! Ported from the NEON versions in neon.rs. Loads and stores go through
//! lane constructors and lane extraction so no unsafe pointer access is
//! needed.

use archmage::{arcane, Wasm128Token};
use core::arch::wasm32::*;

use crate::block::{PixelBlock, PixelBlockMut};
use crate::rule::{AdjustmentRule, ColumnSums, HIGH_BAND_MIN_DIFF, MID_BAND_MIN_DIFF};

#[inline(always)]
fn load_row(row: &[u8]) -> v128 {
    let mut a = [0u8; 16];
    a[..row.len()].copy_from_slice(row);
    u8x16(
        a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7], a[8], a[9], a[10], a[11], a[12], a[13],
        a[14], a[15],
    )
}

#[inline(always)]
fn to_bytes(v: v128) -> [u8; 16] {
    [
        u8x16_extract_lane::<0>(v),
        u8x16_extract_lane::<1>(v),
        u8x16_extract_lane::<2>(v),
        u8x16_extract_lane::<3>(v),
        u8x16_extract_lane::<4>(v),
        u8x16_extract_lane::<5>(v),
        u8x16_extract_lane::<6>(v),
        u8x16_extract_lane::<7>(v),
        u8x16_extract_lane::<8>(v),
        u8x16_extract_lane::<9>(v),
        u8x16_extract_lane::<10>(v),
        u8x16_extract_lane::<11>(v),
        u8x16_extract_lane::<12>(v),
        u8x16_extract_lane::<13>(v),
        u8x16_extract_lane::<14>(v),
        u8x16_extract_lane::<15>(v),
    ]
}

#[inline(always)]
fn store_row(row: &mut [u8], v: v128) {
    let width = row.len();
    row.copy_from_slice(&to_bytes(v)[..width]);
}

#[inline(always)]
fn abd_u8x16(a: v128, b: v128) -> v128 {
    v128_or(u8x16_sub_sat(a, b), u8x16_sub_sat(b, a))
}

#[arcane]
pub(crate) fn adjust_pass_wasm(
    _token: Wasm128Token,
    rule: AdjustmentRule,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
) -> ColumnSums {
    let [cap_low, cap_mid, cap_high] = rule.caps();
    let k_mid = u8x16_splat(MID_BAND_MIN_DIFF);
    let k_high = u8x16_splat(HIGH_BAND_MIN_DIFF);
    let base_cap = u8x16_splat(cap_low);
    let mid_step = u8x16_splat(cap_mid - cap_low);
    let high_step = u8x16_splat(cap_high - cap_mid);

    let mut acc = i8x16_splat(0);

    for y in 0..source.height() {
        let sig = load_row(source.row(y));
        let mc = load_row(prediction.row(y));

        let absdiff = abd_u8x16(mc, sig);
        let in_mid = u8x16_ge(absdiff, k_mid);
        let in_high = u8x16_ge(absdiff, k_high);
        let cap = u8x16_add(
            base_cap,
            u8x16_add(v128_and(in_mid, mid_step), v128_and(in_high, high_step)),
        );
        let adj = u8x16_min(absdiff, cap);

        let mc_gt_sig = u8x16_gt(mc, sig);
        let padj = v128_and(mc_gt_sig, adj);
        let nadj = v128_andnot(adj, mc_gt_sig);

        let out = u8x16_sub_sat(u8x16_add_sat(sig, padj), nadj);
        store_row(output.row_mut(y), out);

        acc = i8x16_add_sat(acc, padj);
        acc = i8x16_sub_sat(acc, nadj);
    }

    ColumnSums::from_lanes(to_bytes(acc).map(|b| b as i8))
}

#[arcane]
pub(crate) fn weak_pass_wasm(
    _token: Wasm128Token,
    delta: u8,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    sums: &mut ColumnSums,
) {
    let k_delta = u8x16_splat(delta);
    let lanes = sums.lanes().map(|v| v as u8);
    let mut acc = load_row(&lanes);

    for y in 0..source.height() {
        let sig = load_row(source.row(y));
        let mc = load_row(prediction.row(y));
        let running = load_row(output.row(y));

        let adj = u8x16_min(abd_u8x16(mc, sig), k_delta);
        let mc_gt_sig = u8x16_gt(mc, sig);
        let padj = v128_and(mc_gt_sig, adj);
        let nadj = v128_andnot(adj, mc_gt_sig);

        let running = u8x16_add_sat(u8x16_sub_sat(running, padj), nadj);
        store_row(output.row_mut(y), running);

        acc = i8x16_sub_sat(acc, padj);
        acc = i8x16_add_sat(acc, nadj);
    }

    *sums = ColumnSums::from_lanes(to_bytes(acc).map(|b| b as i8));
}
