//! Scalar reference kernels.
//!
//! These define the arithmetic every SIMD kernel must reproduce bit for bit.

use crate::block::{PixelBlock, PixelBlockMut};
use crate::rule::{AdjustmentRule, ColumnSums};

/// Main pass: pull each source pixel toward the prediction and record the
/// applied corrections per column.
pub(crate) fn adjust_pass(
    rule: AdjustmentRule,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
) -> ColumnSums {
    let mut sums = ColumnSums::new();
    for y in 0..source.height() {
        let sig = source.row(y);
        let mc = prediction.row(y);
        let out = output.row_mut(y);
        for x in 0..sig.len() {
            let (value, adj) = rule.apply(sig[x], mc[x]);
            out[x] = value;
            sums.add(x, adj);
        }
    }
    sums
}

/// Weak pass: move the denoised pixels back toward the raw source by at most
/// `delta`, undoing part of the correction.
pub(crate) fn weak_pass(
    delta: u8,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    sums: &mut ColumnSums,
) {
    for y in 0..source.height() {
        let sig = source.row(y);
        let mc = prediction.row(y);
        let out = output.row_mut(y);
        for x in 0..sig.len() {
            let adj = sig[x].abs_diff(mc[x]).min(delta);
            if mc[x] > sig[x] {
                out[x] = out[x].saturating_sub(adj);
                sums.sub(x, adj as i8);
            } else if mc[x] < sig[x] {
                out[x] = out[x].saturating_add(adj);
                sums.add(x, adj as i8);
            }
        }
    }
}
