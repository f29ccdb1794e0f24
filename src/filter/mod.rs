//! Luma and chroma block filters.
//!
//! Every entry point runs the same block driver:
//!
//! 1. Blocks with too much motion are copied unfiltered.
//! 2. The adjust pass writes the denoised block to `output` and sums the
//!    applied corrections per column.
//! 3. If the total correction exceeds the geometry's threshold, a weak pass
//!    backs part of it out. If that is not enough (or the excess is too large
//!    to try) the block is copied unfiltered.
//! 4. A filtered block is written back to `source`, which becomes the
//!    temporal reference for the next frame.
//!
//! Only the two passes have per-architecture kernels. All of them derive
//! their constants from [`AdjustmentRule`] and must agree with the scalar
//! kernels byte for byte.

// On targets without SIMD kernels the token is passed but never dispatched
#![allow(unused_variables)]

mod scalar;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod sse2;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
mod neon;

#[cfg(all(feature = "simd", target_arch = "wasm32"))]
mod wasm;

use crate::block::{BlockGeometry, PixelBlock, PixelBlockMut};
use crate::rule::{weak_pass_delta, AdjustmentRule, ColumnSums, DenoiseStrength};

/// Token type for the kernels available on this target.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub(crate) type SimdTokenType = Option<archmage::X64V3Token>;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
pub(crate) type SimdTokenType = Option<archmage::NeonToken>;

#[cfg(all(feature = "simd", target_arch = "wasm32"))]
pub(crate) type SimdTokenType = Option<archmage::Wasm128Token>;

#[cfg(not(all(
    feature = "simd",
    any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "wasm32")
)))]
pub(crate) type SimdTokenType = Option<()>;

/// Detect the CPU features the SIMD kernels need.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub(crate) fn summon_token() -> SimdTokenType {
    use archmage::SimdToken;
    archmage::X64V3Token::summon()
}

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
pub(crate) fn summon_token() -> SimdTokenType {
    use archmage::SimdToken;
    archmage::NeonToken::summon()
}

#[cfg(all(feature = "simd", target_arch = "wasm32"))]
pub(crate) fn summon_token() -> SimdTokenType {
    use archmage::SimdToken;
    archmage::Wasm128Token::summon()
}

#[cfg(not(all(
    feature = "simd",
    any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "wasm32")
)))]
pub(crate) fn summon_token() -> SimdTokenType {
    None
}

/// What a filter call did with the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDecision {
    /// `output` holds the denoised block and `source` was overwritten with it.
    Filtered,
    /// `output` holds a copy of the raw source; `source` is unchanged.
    Copied,
}

/// Which kernels a filter call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Implementation {
    /// Portable scalar reference.
    Scalar,
    /// SIMD kernels when the CPU supports them, scalar otherwise.
    #[default]
    Accelerated,
}

impl Implementation {
    /// Whether [`Implementation::Accelerated`] runs SIMD kernels on this
    /// machine.
    pub fn simd_available() -> bool {
        summon_token().is_some()
    }

    pub(crate) fn token(self) -> SimdTokenType {
        match self {
            Implementation::Scalar => None,
            Implementation::Accelerated => summon_token(),
        }
    }

    /// Filter a 16×16 luma block. See [`filter_luma`].
    pub fn filter_luma(
        self,
        prediction: &PixelBlock<'_>,
        output: &mut PixelBlockMut<'_>,
        source: &mut PixelBlockMut<'_>,
        motion_magnitude: u32,
        strength: DenoiseStrength,
    ) -> FilterDecision {
        denoise_block(
            self.token(),
            BlockGeometry::LUMA,
            prediction,
            output,
            source,
            motion_magnitude,
            strength,
        )
    }

    /// Filter an 8×8 chroma block. See [`filter_chroma`].
    pub fn filter_chroma(
        self,
        prediction: &PixelBlock<'_>,
        output: &mut PixelBlockMut<'_>,
        source: &mut PixelBlockMut<'_>,
        motion_magnitude: u32,
        strength: DenoiseStrength,
    ) -> FilterDecision {
        denoise_block(
            self.token(),
            BlockGeometry::CHROMA,
            prediction,
            output,
            source,
            motion_magnitude,
            strength,
        )
    }

    /// Filter a block of any supported geometry. See [`filter_block`].
    pub fn filter_block(
        self,
        geometry: BlockGeometry,
        prediction: &PixelBlock<'_>,
        output: &mut PixelBlockMut<'_>,
        source: &mut PixelBlockMut<'_>,
        motion_magnitude: u32,
        strength: DenoiseStrength,
    ) -> FilterDecision {
        denoise_block(
            self.token(),
            geometry,
            prediction,
            output,
            source,
            motion_magnitude,
            strength,
        )
    }

    /// Function-pointer table for this implementation.
    pub fn kernels(self) -> FilterKernels {
        match self {
            Implementation::Scalar => FilterKernels::SCALAR,
            Implementation::Accelerated => FilterKernels::ACCELERATED,
        }
    }
}

/// Signature shared by every block filter entry point.
pub type BlockFilterFn = fn(
    &PixelBlock<'_>,
    &mut PixelBlockMut<'_>,
    &mut PixelBlockMut<'_>,
    u32,
    DenoiseStrength,
) -> FilterDecision;

/// Luma and chroma filters of one implementation.
///
/// A conformance harness can hold two tables and feed both the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct FilterKernels {
    /// 16×16 luma filter.
    pub luma: BlockFilterFn,
    /// 8×8 chroma filter.
    pub chroma: BlockFilterFn,
}

impl FilterKernels {
    /// Scalar reference kernels.
    pub const SCALAR: Self = Self {
        luma: filter_luma_scalar,
        chroma: filter_chroma_scalar,
    };

    /// Best kernels for the running CPU.
    pub const ACCELERATED: Self = Self {
        luma: filter_luma,
        chroma: filter_chroma,
    };
}

/// Denoise a 16×16 luma block with the best available kernels.
///
/// `prediction` is the motion-compensated block from the previous denoised
/// frame. `source` holds the current frame's raw samples on entry.
///
/// # Persistent reference
///
/// On [`FilterDecision::Filtered`], `output` holds the denoised block and
/// the same samples are written into `source`, which the encoder keeps as
/// the running denoised reference for the next frame. On
/// [`FilterDecision::Copied`], `output` receives the raw source and `source`
/// is left as it was.
///
/// All three views must be 16×16; strides may differ.
pub fn filter_luma(
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Accelerated.filter_luma(
        prediction,
        output,
        source,
        motion_magnitude,
        strength,
    )
}

/// Denoise an 8×8 chroma block with the best available kernels.
///
/// Same contract as [`filter_luma`] with the chroma thresholds.
pub fn filter_chroma(
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Accelerated.filter_chroma(
        prediction,
        output,
        source,
        motion_magnitude,
        strength,
    )
}

/// Denoise a block of arbitrary geometry (up to 16×16) with the best
/// available kernels.
pub fn filter_block(
    geometry: BlockGeometry,
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Accelerated.filter_block(
        geometry,
        prediction,
        output,
        source,
        motion_magnitude,
        strength,
    )
}

/// Scalar reference version of [`filter_luma`].
pub fn filter_luma_scalar(
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Scalar.filter_luma(prediction, output, source, motion_magnitude, strength)
}

/// Scalar reference version of [`filter_chroma`].
pub fn filter_chroma_scalar(
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Scalar.filter_chroma(prediction, output, source, motion_magnitude, strength)
}

/// Scalar reference version of [`filter_block`].
pub fn filter_block_scalar(
    geometry: BlockGeometry,
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    Implementation::Scalar.filter_block(
        geometry,
        prediction,
        output,
        source,
        motion_magnitude,
        strength,
    )
}

pub(crate) fn denoise_block(
    simd_token: SimdTokenType,
    geometry: BlockGeometry,
    prediction: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    source: &mut PixelBlockMut<'_>,
    motion_magnitude: u32,
    strength: DenoiseStrength,
) -> FilterDecision {
    let dims = (geometry.width(), geometry.height());
    debug_assert_eq!((prediction.width(), prediction.height()), dims);
    debug_assert_eq!((output.width(), output.height()), dims);
    debug_assert_eq!((source.width(), source.height()), dims);

    let Some(rule) = AdjustmentRule::for_block(motion_magnitude, strength) else {
        output.copy_from(&source.as_block());
        return FilterDecision::Copied;
    };
    let threshold = geometry.sum_diff_threshold(strength);

    let mut sums = adjust_pass(simd_token, rule, prediction, &source.as_block(), output);
    let sum_diff = sums.total().unsigned_abs();
    if sum_diff > threshold {
        let Some(delta) = weak_pass_delta(sum_diff, threshold) else {
            output.copy_from(&source.as_block());
            return FilterDecision::Copied;
        };
        weak_pass(simd_token, delta, prediction, &source.as_block(), output, &mut sums);
        if sums.total().unsigned_abs() > threshold {
            output.copy_from(&source.as_block());
            return FilterDecision::Copied;
        }
    }

    source.copy_from(&output.as_block());
    FilterDecision::Filtered
}

#[inline]
fn adjust_pass(
    simd_token: SimdTokenType,
    rule: AdjustmentRule,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
) -> ColumnSums {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    if let Some(token) = simd_token {
        return sse2::adjust_pass_sse2(token, rule, prediction, source, output);
    }

    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    if let Some(token) = simd_token {
        return neon::adjust_pass_neon(token, rule, prediction, source, output);
    }

    #[cfg(all(feature = "simd", target_arch = "wasm32"))]
    if let Some(token) = simd_token {
        return wasm::adjust_pass_wasm(token, rule, prediction, source, output);
    }

    scalar::adjust_pass(rule, prediction, source, output)
}

#[inline]
fn weak_pass(
    simd_token: SimdTokenType,
    delta: u8,
    prediction: &PixelBlock<'_>,
    source: &PixelBlock<'_>,
    output: &mut PixelBlockMut<'_>,
    sums: &mut ColumnSums,
) {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    if let Some(token) = simd_token {
        sse2::weak_pass_sse2(token, delta, prediction, source, output, sums);
        return;
    }

    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    if let Some(token) = simd_token {
        neon::weak_pass_neon(token, delta, prediction, source, output, sums);
        return;
    }

    #[cfg(all(feature = "simd", target_arch = "wasm32"))]
    if let Some(token) = simd_token {
        wasm::weak_pass_wasm(token, delta, prediction, source, output, sums);
        return;
    }

    scalar::weak_pass(delta, prediction, source, output, sums);
}
