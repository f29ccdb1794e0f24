//! Temporal denoising filter for a VP8 encoder's reconstruction loop.
//!
//! Given a motion-compensated prediction of a block from the previous
//! denoised frame and the current frame's raw block, the filter pulls each
//! source pixel toward the prediction by an amount that depends on how far
//! apart they are. The result is written to an output block and back into
//! the source buffer, which the encoder keeps as the running denoised
//! reference for the next frame.
//!
//! # Features
//!
//! - `std` (default): `std::error::Error` for [`DenoiseError`].
//! - `simd` (default): SSE2-class x86_64, NEON and WASM SIMD128 kernels.
//!
//! The crate does no allocation and works in `no_std` environments.
//!
//! # Filtering a block
//!
//! ```rust
//! use zendenoise::{filter_luma, DenoiseStrength, FilterDecision, PixelBlock, PixelBlockMut};
//!
//! let prediction = [120u8; 256];
//! let mut output = [0u8; 256];
//! let mut source = [118u8; 256];
//!
//! let decision = filter_luma(
//!     &PixelBlock::new(&prediction, 16, 16, 16)?,
//!     &mut PixelBlockMut::new(&mut output, 16, 16, 16)?,
//!     &mut PixelBlockMut::new(&mut source, 16, 16, 16)?,
//!     4,
//!     DenoiseStrength::Normal,
//! );
//! assert_eq!(decision, FilterDecision::Filtered);
//! assert_eq!(output, [120u8; 256]);
//! assert_eq!(source, output);
//! # Ok::<(), zendenoise::DenoiseError>(())
//! ```
//!
//! # Bit-exactness
//!
//! The scalar kernels ([`filter_luma_scalar`], [`filter_chroma_scalar`]) are
//! the reference. The SIMD kernels produce identical `output` and `source`
//! bytes for every input; [`FilterKernels`] exposes both sets behind one
//! signature for conformance testing.
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`. With the `simd` feature the
//! kernels rely on [`archmage`]'s `#[arcane]` macro, which generates the
//! `unsafe` target-feature calls after a CPU capability token has been
//! obtained at runtime.
//!
//! [`archmage`]: https://docs.rs/archmage

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

extern crate alloc;

mod block;
mod denoiser;
mod error;
mod filter;
pub mod rule;

pub use block::{
    BlockGeometry, BlockSet, PixelBlock, PixelBlockMut, CHROMA_BLOCK_DIM, LUMA_BLOCK_DIM,
    MAX_BLOCK_DIM,
};
pub use denoiser::{DenoiseStats, Denoiser, DenoiserConfig, MacroblockBlocks, MacroblockDecision};
pub use error::{BlockRole, DenoiseError};
pub use filter::{
    filter_block, filter_block_scalar, filter_chroma, filter_chroma_scalar, filter_luma,
    filter_luma_scalar, BlockFilterFn, FilterDecision, FilterKernels, Implementation,
};
pub use rule::{AdjustmentRule, DenoiseStrength, MOTION_MAGNITUDE_THRESHOLD};
