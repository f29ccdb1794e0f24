//! x86_64 kernels using SSE2 byte arithmetic.
//!
//! One row lives in one register: 16 lanes for luma, 8 used lanes for
//! chroma (the rest are zero and contribute nothing). Saturating byte adds
//! provide both the [0, 255] clamp on pixels and the `i8` saturation of the
//! column sums, matching the scalar kernels exactly.

use archmage::{arcane, X64V3Token};
use core::arch::x86_64::*;
use safe_unaligned_simd::x86_64 as simd_mem;

use crate::block::{PixelBlock, PixelBlockMut};
use crate::rule::{AdjustmentRule, ColumnSums, HIGH_BAND_MIN_DIFF, MID_BAND_MIN_DIFF};

/// Copy a row into a zero-padded 16-byte array.
#[inline(always)]
fn padded(row: &[u8]) -> [u8; 16] {
    let mut lanes = [0u8; 16];
    lanes[..row.len()].copy_from_slice(row);
    lanes
}

#[inline(always)]
fn to_i8_lanes(bytes: [u8; 16]) -> [i8; 16] {
    bytes.map(|b| b as i8)
}

#[inline(always)]
fn to_u8_lanes(lanes: [i8; 16]) -> [u8; 16] {
    lanes.map(|v| v as u8)
}

#[arcane]
pub(crate) fn adjust_pass_sse2(
    _token: X64V3Token,
    rule: AdjustmentRule,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
) -> ColumnSums {
    let zero = _mm_setzero_si128();
    let [cap_low, cap_mid, cap_high] = rule.caps();
    let k_mid = _mm_set1_epi8(MID_BAND_MIN_DIFF as i8);
    let k_high = _mm_set1_epi8(HIGH_BAND_MIN_DIFF as i8);
    let base_cap = _mm_set1_epi8(cap_low as i8);
    let mid_step = _mm_set1_epi8((cap_mid - cap_low) as i8);
    let high_step = _mm_set1_epi8((cap_high - cap_mid) as i8);

    let width = source.width();
    let mut acc = zero;
    let mut out_lanes = [0u8; 16];

    for y in 0..source.height() {
        let sig = simd_mem::_mm_loadu_si128(&padded(source.row(y)));
        let mc = simd_mem::_mm_loadu_si128(&padded(prediction.row(y)));

        // |mc - sig| from the two one-sided saturating differences
        let pdiff = _mm_subs_epu8(mc, sig);
        let ndiff = _mm_subs_epu8(sig, mc);
        let absdiff = _mm_or_si128(pdiff, ndiff);

        // Unsigned absdiff >= k masks
        let in_mid = _mm_cmpeq_epi8(_mm_max_epu8(absdiff, k_mid), absdiff);
        let in_high = _mm_cmpeq_epi8(_mm_max_epu8(absdiff, k_high), absdiff);
        let cap = _mm_add_epi8(
            base_cap,
            _mm_add_epi8(
                _mm_and_si128(in_mid, mid_step),
                _mm_and_si128(in_high, high_step),
            ),
        );
        let adj = _mm_min_epu8(absdiff, cap);

        // Lanes where mc <= sig move down, the rest move up
        let mc_le_sig = _mm_cmpeq_epi8(pdiff, zero);
        let padj = _mm_andnot_si128(mc_le_sig, adj);
        let nadj = _mm_and_si128(mc_le_sig, adj);

        let out = _mm_subs_epu8(_mm_adds_epu8(sig, padj), nadj);
        simd_mem::_mm_storeu_si128(&mut out_lanes, out);
        output.row_mut(y).copy_from_slice(&out_lanes[..width]);

        acc = _mm_adds_epi8(acc, padj);
        acc = _mm_subs_epi8(acc, nadj);
    }

    let mut sums = [0u8; 16];
    simd_mem::_mm_storeu_si128(&mut sums, acc);
    ColumnSums::from_lanes(to_i8_lanes(sums))
}

#[arcane]
pub(crate) fn weak_pass_sse2(
    _token: X64V3Token,
    delta: u8,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    sums: &mut ColumnSums,
) {
    let zero = _mm_setzero_si128();
    let k_delta = _mm_set1_epi8(delta as i8);

    let width = source.width();
    let mut acc = simd_mem::_mm_loadu_si128(&to_u8_lanes(sums.lanes()));
    let mut out_lanes = [0u8; 16];

    for y in 0..source.height() {
        let sig = simd_mem::_mm_loadu_si128(&padded(source.row(y)));
        let mc = simd_mem::_mm_loadu_si128(&padded(prediction.row(y)));
        let running = simd_mem::_mm_loadu_si128(&padded(output.row(y)));

        let pdiff = _mm_subs_epu8(mc, sig);
        let ndiff = _mm_subs_epu8(sig, mc);
        let adj = _mm_min_epu8(_mm_or_si128(pdiff, ndiff), k_delta);

        let mc_le_sig = _mm_cmpeq_epi8(pdiff, zero);
        let padj = _mm_andnot_si128(mc_le_sig, adj);
        let nadj = _mm_and_si128(mc_le_sig, adj);

        let running = _mm_adds_epu8(_mm_subs_epu8(running, padj), nadj);
        simd_mem::_mm_storeu_si128(&mut out_lanes, running);
        output.row_mut(y).copy_from_slice(&out_lanes[..width]);

        acc = _mm_subs_epi8(acc, padj);
        acc = _mm_adds_epi8(acc, nadj);
    }

    let mut lanes = [0u8; 16];
    simd_mem::_mm_storeu_si128(&mut lanes, acc);
    *sums = ColumnSums::from_lanes(to_i8_lanes(lanes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::scalar;
    use crate::rule::DenoiseStrength;
    use archmage::SimdToken;

    fn pattern(seed: u32, len: usize) -> alloc::vec::Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn adjust_pass_matches_scalar() {
        let Some(token) = X64V3Token::summon() else {
            return;
        };
        let sig = pattern(1, 16 * 16);
        // Prediction spread over every band, including wide differences
        let pred: alloc::vec::Vec<u8> = sig
            .iter()
            .zip(pattern(2, 16 * 16))
            .map(|(&s, r)| s.wrapping_add(r % 41).wrapping_sub(20))
            .collect();
        for strength in [DenoiseStrength::Normal, DenoiseStrength::Increased] {
            let rule = AdjustmentRule::new(strength);
            for (w, h) in [(16, 16), (8, 8), (5, 3)] {
                let p = PixelBlock::new(&pred, w, h, 16).unwrap();
                let s = PixelBlock::new(&sig, w, h, 16).unwrap();
                let mut out_scalar = [0u8; 256];
                let mut out_simd = [0u8; 256];
                let sums_scalar = scalar::adjust_pass(
                    rule,
                    &p,
                    &s,
                    &mut PixelBlockMut::new(&mut out_scalar, w, h, 16).unwrap(),
                );
                let sums_simd = adjust_pass_sse2(
                    token,
                    rule,
                    &p,
                    &s,
                    &mut PixelBlockMut::new(&mut out_simd, w, h, 16).unwrap(),
                );
                assert_eq!(out_scalar, out_simd, "{w}x{h} {strength:?}");
                assert_eq!(sums_scalar, sums_simd, "{w}x{h} {strength:?}");
            }
        }
    }

    #[test]
    fn weak_pass_matches_scalar() {
        let Some(token) = X64V3Token::summon() else {
            return;
        };
        let sig = pattern(3, 256);
        let pred = pattern(4, 256);
        let start = pattern(5, 256);
        let start_sums = ColumnSums::from_lanes(to_i8_lanes(
            <[u8; 16]>::try_from(&pattern(6, 16)[..]).unwrap(),
        ));
        for delta in 1..=3 {
            let p = PixelBlock::new(&pred, 16, 16, 16).unwrap();
            let s = PixelBlock::new(&sig, 16, 16, 16).unwrap();
            let mut out_scalar = <[u8; 256]>::try_from(&start[..]).unwrap();
            let mut out_simd = out_scalar;
            let mut sums_scalar = start_sums;
            let mut sums_simd = start_sums;
            scalar::weak_pass(
                delta,
                &p,
                &s,
                &mut PixelBlockMut::new(&mut out_scalar, 16, 16, 16).unwrap(),
                &mut sums_scalar,
            );
            weak_pass_sse2(
                token,
                delta,
                &p,
                &s,
                &mut PixelBlockMut::new(&mut out_simd, 16, 16, 16).unwrap(),
                &mut sums_simd,
            );
            assert_eq!(out_scalar, out_simd, "delta {delta}");
            assert_eq!(sums_scalar, sums_simd, "delta {delta}");
        }
    }
}
