//! Error type for pixel-block view and geometry construction.

use thiserror::Error;

/// Which of the three buffers of a filter call an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    /// Motion-compensated prediction (read-only input).
    Prediction,
    /// Raw source samples, overwritten with the persistent reference.
    Source,
    /// Denoised output.
    Output,
    /// A view not yet bound to a role.
    Unspecified,
}

impl core::fmt::Display for BlockRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            BlockRole::Prediction => "prediction",
            BlockRole::Source => "source",
            BlockRole::Output => "output",
            BlockRole::Unspecified => "block",
        };
        f.write_str(name)
    }
}

/// Errors raised when a block view or a block geometry is rejected.
///
/// The filters themselves never fail; every check happens when the views
/// are built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DenoiseError {
    /// Width or height is zero.
    #[error("{role}: zero dimension {width}x{height}")]
    ZeroDimension {
        /// Buffer the error refers to.
        role: BlockRole,
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// Width or height exceeds the 16 samples a kernel row can hold.
    #[error("{role}: dimensions {width}x{height} exceed {max}x{max}")]
    DimensionTooLarge {
        /// Buffer the error refers to.
        role: BlockRole,
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Largest supported width and height.
        max: usize,
    },

    /// Row stride is shorter than the logical width.
    #[error("{role}: stride {stride} is smaller than width {width}")]
    StrideTooSmall {
        /// Buffer the error refers to.
        role: BlockRole,
        /// Requested stride.
        stride: usize,
        /// Logical width.
        width: usize,
    },

    /// A view's size differs from the prediction's.
    #[error("{role}: block is {width}x{height}, prediction is {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Buffer the error refers to.
        role: BlockRole,
        /// Width of the offending view.
        width: usize,
        /// Height of the offending view.
        height: usize,
        /// Width of the prediction.
        expected_width: usize,
        /// Height of the prediction.
        expected_height: usize,
    },

    /// Backing slice does not cover the last row.
    #[error("{role}: buffer of {len} bytes, need at least {needed}")]
    BufferTooSmall {
        /// Buffer the error refers to.
        role: BlockRole,
        /// Bytes required for the requested geometry.
        needed: usize,
        /// Bytes actually provided.
        len: usize,
    },
}
