//! Macroblock-level denoiser.
//!
//! Wraps the block filters with the encoder-facing configuration and keeps
//! running counts of what the filters decided.
//!
//! ```rust
//! use zendenoise::{BlockSet, Denoiser, DenoiserConfig, DenoiseStrength, MacroblockBlocks};
//! use zendenoise::{PixelBlock, PixelBlockMut};
//!
//! let prediction = [128u8; 256];
//! let mut output = [0u8; 256];
//! let mut source = [126u8; 256];
//!
//! let mut denoiser = Denoiser::new(
//!     DenoiserConfig::new()
//!         .with_strength(DenoiseStrength::Increased)
//!         .with_chroma(false),
//! );
//! let luma = BlockSet::new(
//!     PixelBlock::new(&prediction, 16, 16, 16)?,
//!     PixelBlockMut::new(&mut output, 16, 16, 16)?,
//!     PixelBlockMut::new(&mut source, 16, 16, 16)?,
//! )?;
//! let decision = denoiser.denoise_macroblock(MacroblockBlocks::luma_only(luma), 0);
//! assert!(decision.luma_filtered());
//! assert_eq!(source, [128u8; 256]);
//! # Ok::<(), zendenoise::DenoiseError>(())
//! ```

use crate::block::{BlockGeometry, BlockSet};
use crate::filter::{denoise_block, summon_token, FilterDecision, SimdTokenType};
use crate::rule::DenoiseStrength;

/// Denoiser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct DenoiserConfig {
    /// Correction caps. Default: [`DenoiseStrength::Normal`].
    pub strength: DenoiseStrength,
    /// Also filter the U and V blocks. Default: true.
    pub denoise_chroma: bool,
    /// Use SIMD kernels when the CPU supports them. Default: true.
    pub use_simd: bool,
    /// Geometry of the chroma blocks. Default: 8×8 (4:2:0).
    pub chroma_geometry: BlockGeometry,
}

impl Default for DenoiserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DenoiserConfig {
    /// Defaults: normal strength, chroma on, SIMD on, 4:2:0 chroma.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strength: DenoiseStrength::Normal,
            denoise_chroma: true,
            use_simd: true,
            chroma_geometry: BlockGeometry::CHROMA,
        }
    }

    /// Set the correction strength.
    #[must_use]
    pub fn with_strength(mut self, strength: DenoiseStrength) -> Self {
        self.strength = strength;
        self
    }

    /// Set the encoder's "increase denoising" flag.
    #[must_use]
    pub fn with_increased_denoising(mut self, increase: bool) -> Self {
        self.strength = DenoiseStrength::from(increase);
        self
    }

    /// Enable or disable chroma filtering.
    #[must_use]
    pub fn with_chroma(mut self, enabled: bool) -> Self {
        self.denoise_chroma = enabled;
        self
    }

    /// Enable or disable the SIMD kernels.
    #[must_use]
    pub fn with_simd(mut self, enabled: bool) -> Self {
        self.use_simd = enabled;
        self
    }

    /// Set the chroma block geometry (see [`BlockGeometry::chroma`]).
    #[must_use]
    pub fn with_chroma_geometry(mut self, geometry: BlockGeometry) -> Self {
        self.chroma_geometry = geometry;
        self
    }
}

/// Blocks of one macroblock. Chroma planes are optional.
#[derive(Debug)]
pub struct MacroblockBlocks<'a> {
    /// 16×16 luma block.
    pub y: BlockSet<'a>,
    /// U block, shaped like the configured chroma geometry.
    pub u: Option<BlockSet<'a>>,
    /// V block, shaped like the configured chroma geometry.
    pub v: Option<BlockSet<'a>>,
}

impl<'a> MacroblockBlocks<'a> {
    /// Luma and both chroma blocks.
    pub fn new(y: BlockSet<'a>, u: BlockSet<'a>, v: BlockSet<'a>) -> Self {
        Self {
            y,
            u: Some(u),
            v: Some(v),
        }
    }

    /// Luma block only.
    pub fn luma_only(y: BlockSet<'a>) -> Self {
        Self { y, u: None, v: None }
    }
}

/// Per-plane decisions for one macroblock. `None` for a chroma plane that
/// was not filtered (disabled or not supplied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroblockDecision {
    /// Luma decision.
    pub y: FilterDecision,
    /// U decision.
    pub u: Option<FilterDecision>,
    /// V decision.
    pub v: Option<FilterDecision>,
}

impl MacroblockDecision {
    /// Whether the luma block was denoised.
    pub fn luma_filtered(&self) -> bool {
        self.y == FilterDecision::Filtered
    }
}

/// Counts of filter decisions since creation or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DenoiseStats {
    /// Macroblocks processed.
    pub macroblocks: u64,
    /// Luma blocks denoised.
    pub luma_filtered: u64,
    /// Luma blocks copied unfiltered.
    pub luma_copied: u64,
    /// Chroma blocks denoised (U and V counted separately).
    pub chroma_filtered: u64,
    /// Chroma blocks copied unfiltered.
    pub chroma_copied: u64,
}

impl DenoiseStats {
    fn record_luma(&mut self, decision: FilterDecision) {
        match decision {
            FilterDecision::Filtered => self.luma_filtered += 1,
            FilterDecision::Copied => self.luma_copied += 1,
        }
    }

    fn record_chroma(&mut self, decision: FilterDecision) {
        match decision {
            FilterDecision::Filtered => self.chroma_filtered += 1,
            FilterDecision::Copied => self.chroma_copied += 1,
        }
    }

    /// Share of luma blocks that were denoised, in [0, 1].
    pub fn luma_filter_ratio(&self) -> f64 {
        let total = self.luma_filtered + self.luma_copied;
        if total == 0 {
            0.0
        } else {
            self.luma_filtered as f64 / total as f64
        }
    }
}

/// Temporal denoiser for the encoder's reconstruction loop.
///
/// Holds the configuration and a SIMD token detected once at construction.
/// The running reference lives in the caller's buffers (`source` of each
/// [`BlockSet`]); the denoiser itself only keeps statistics.
pub struct Denoiser {
    config: DenoiserConfig,
    simd_token: SimdTokenType,
    stats: DenoiseStats,
}

impl core::fmt::Debug for Denoiser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Denoiser")
            .field("config", &self.config)
            .field("uses_simd", &self.uses_simd())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Denoiser {
    /// Create a denoiser, detecting SIMD support if enabled.
    pub fn new(config: DenoiserConfig) -> Self {
        let simd_token = if config.use_simd { summon_token() } else { None };
        Self {
            config,
            simd_token,
            stats: DenoiseStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DenoiserConfig {
        &self.config
    }

    /// Whether SIMD kernels are in use.
    pub fn uses_simd(&self) -> bool {
        self.simd_token.is_some()
    }

    /// Decision counts so far.
    pub fn stats(&self) -> DenoiseStats {
        self.stats
    }

    /// Zero the decision counts.
    pub fn reset_stats(&mut self) {
        self.stats = DenoiseStats::default();
    }

    /// Filter one macroblock.
    ///
    /// The luma block is always filtered. Chroma blocks are filtered when
    /// chroma denoising is enabled and they are supplied; otherwise their
    /// buffers are not touched.
    pub fn denoise_macroblock(
        &mut self,
        blocks: MacroblockBlocks<'_>,
        motion_magnitude: u32,
    ) -> MacroblockDecision {
        let strength = self.config.strength;
        let MacroblockBlocks { mut y, u, v } = blocks;

        let y_decision = self.filter(BlockGeometry::LUMA, &mut y, motion_magnitude, strength);
        self.stats.record_luma(y_decision);

        let u_decision = self.denoise_chroma(u, motion_magnitude, strength);
        let v_decision = self.denoise_chroma(v, motion_magnitude, strength);

        self.stats.macroblocks += 1;
        MacroblockDecision {
            y: y_decision,
            u: u_decision,
            v: v_decision,
        }
    }

    fn denoise_chroma(
        &mut self,
        set: Option<BlockSet<'_>>,
        motion_magnitude: u32,
        strength: DenoiseStrength,
    ) -> Option<FilterDecision> {
        if !self.config.denoise_chroma {
            return None;
        }
        let mut set = set?;
        let geometry = self.config.chroma_geometry;
        let decision = self.filter(geometry, &mut set, motion_magnitude, strength);
        self.stats.record_chroma(decision);
        Some(decision)
    }

    fn filter(
        &self,
        geometry: BlockGeometry,
        set: &mut BlockSet<'_>,
        motion_magnitude: u32,
        strength: DenoiseStrength,
    ) -> FilterDecision {
        denoise_block(
            self.simd_token,
            geometry,
            &set.prediction,
            &mut set.output,
            &mut set.source,
            motion_magnitude,
            strength,
        )
    }
}
