//! AArch64 NEON kernels.
//!
//! Same lane layout as the x86 version: one row per `uint8x16_t`, unused
//! chroma lanes zeroed.

use archmage::{arcane, NeonToken};
use core::arch::aarch64::*;
use safe_unaligned_simd::aarch64 as simd_mem;

use crate::block::{PixelBlock, PixelBlockMut};
use crate::rule::{AdjustmentRule, ColumnSums, HIGH_BAND_MIN_DIFF, MID_BAND_MIN_DIFF};

#[inline(always)]
fn padded(row: &[u8]) -> [u8; 16] {
    let mut lanes = [0u8; 16];
    lanes[..row.len()].copy_from_slice(row);
    lanes
}

#[arcane]
pub(crate) fn adjust_pass_neon(
    _token: NeonToken,
    rule: AdjustmentRule,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
) -> ColumnSums {
    let [cap_low, cap_mid, cap_high] = rule.caps();
    let k_mid = vdupq_n_u8(MID_BAND_MIN_DIFF);
    let k_high = vdupq_n_u8(HIGH_BAND_MIN_DIFF);
    let base_cap = vdupq_n_u8(cap_low);
    let mid_step = vdupq_n_u8(cap_mid - cap_low);
    let high_step = vdupq_n_u8(cap_high - cap_mid);

    let width = source.width();
    let mut acc = vdupq_n_s8(0);
    let mut out_lanes = [0u8; 16];

    for y in 0..source.height() {
        let sig = simd_mem::vld1q_u8(&padded(source.row(y)));
        let mc = simd_mem::vld1q_u8(&padded(prediction.row(y)));

        let absdiff = vabdq_u8(mc, sig);
        let in_mid = vcgeq_u8(absdiff, k_mid);
        let in_high = vcgeq_u8(absdiff, k_high);
        let cap = vaddq_u8(
            base_cap,
            vaddq_u8(vandq_u8(in_mid, mid_step), vandq_u8(in_high, high_step)),
        );
        let adj = vminq_u8(absdiff, cap);

        // mc > sig lanes move up, the rest move down
        let mc_gt_sig = vcgtq_u8(mc, sig);
        let padj = vandq_u8(mc_gt_sig, adj);
        let nadj = vbicq_u8(adj, mc_gt_sig);

        let out = vqsubq_u8(vqaddq_u8(sig, padj), nadj);
        simd_mem::vst1q_u8(&mut out_lanes, out);
        output.row_mut(y).copy_from_slice(&out_lanes[..width]);

        acc = vqaddq_s8(acc, vreinterpretq_s8_u8(padj));
        acc = vqsubq_s8(acc, vreinterpretq_s8_u8(nadj));
    }

    let mut lanes = [0u8; 16];
    simd_mem::vst1q_u8(&mut lanes, vreinterpretq_u8_s8(acc));
    ColumnSums::from_lanes(lanes.map(|b| b as i8))
}

#[arcane]
pub(crate) fn weak_pass_neon(
    _token: NeonToken,
    delta: u8,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    sums: &mut ColumnSums,
) {
    let k_delta = vdupq_n_u8(delta);

    let width = source.width();
    let mut acc = vreinterpretq_s8_u8(simd_mem::vld1q_u8(&sums.lanes().map(|v| v as u8)));
    let mut out_lanes = [0u8; 16];

    for y in 0..source.height() {
        let sig = simd_mem::vld1q_u8(&padded(source.row(y)));
        let mc = simd_mem::vld1q_u8(&padded(prediction.row(y)));
        let running = simd_mem::vld1q_u8(&padded(output.row(y)));

        let adj = vminq_u8(vabdq_u8(mc, sig), k_delta);
        let mc_gt_sig = vcgtq_u8(mc, sig);
        let padj = vandq_u8(mc_gt_sig, adj);
        let nadj = vbicq_u8(adj, mc_gt_sig);

        let running = vqaddq_u8(vqsubq_u8(running, padj), nadj);
        simd_mem::vst1q_u8(&mut out_lanes, running);
        output.row_mut(y).copy_from_slice(&out_lanes[..width]);

        acc = vqsubq_s8(acc, vreinterpretq_s8_u8(padj));
        acc = vqaddq_s8(acc, vreinterpretq_s8_u8(nadj));
    }

    let mut lanes = [0u8; 16];
    simd_mem::vst1q_u8(&mut lanes, vreinterpretq_u8_s8(acc));
    *sums = ColumnSums::from_lanes(lanes.map(|b| b as i8));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::scalar;
    use crate::rule::DenoiseStrength;
    use archmage::SimdToken;

    #[test]
    fn adjust_pass_matches_scalar_at_band_edges() {
        let Some(token) = NeonToken::summon() else {
            return;
        };
        // Every diff from -24 to 24 around mid-grey plus the clamp extremes
        let mut sig = [128u8; 256];
        let mut pred = [128u8; 256];
        for (i, p) in pred.iter_mut().enumerate().take(49) {
            *p = (104 + i) as u8;
        }
        sig[200] = 0;
        pred[200] = 255;
        sig[201] = 255;
        pred[201] = 0;
        for strength in [DenoiseStrength::Normal, DenoiseStrength::Increased] {
            let rule = AdjustmentRule::new(strength);
            let p = PixelBlock::new(&pred, 16, 16, 16).unwrap();
            let s = PixelBlock::new(&sig, 16, 16, 16).unwrap();
            let mut out_scalar = [0u8; 256];
            let mut out_simd = [0u8; 256];
            let a = scalar::adjust_pass(
                rule,
                &p,
                &s,
                &mut PixelBlockMut::new(&mut out_scalar, 16, 16, 16).unwrap(),
            );
            let b = adjust_pass_neon(
                token,
                rule,
                &p,
                &s,
                &mut PixelBlockMut::new(&mut out_simd, 16, 16, 16).unwrap(),
            );
            assert_eq!(out_scalar, out_simd);
            assert_eq!(a, b);
        }
    }
}
