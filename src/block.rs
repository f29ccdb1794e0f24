//! Strided pixel-block views and block geometry.
//!
//! A filter call touches three blocks of identical logical size. Each block
//! is a window into a larger plane: rows are `stride` bytes apart and only
//! the first `width` bytes of a row belong to the block. Views validate their
//! geometry once at construction so the kernels can index without further
//! checks failing.

use crate::error::{BlockRole, DenoiseError};
use crate::rule::DenoiseStrength;

/// Largest block width or height the kernels handle (one 128-bit row).
pub const MAX_BLOCK_DIM: usize = 16;

/// Side of a VP8 luma macroblock.
pub const LUMA_BLOCK_DIM: usize = 16;

/// Side of a VP8 4:2:0 chroma block.
pub const CHROMA_BLOCK_DIM: usize = 8;

/// Block dimensions plus the block-level sum-of-differences limits.
///
/// The thresholds bound how much total correction a block may receive before
/// the filter falls back to a weak pass or gives up and copies the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    width: usize,
    height: usize,
    sum_diff_threshold: u32,
    sum_diff_threshold_increased: u32,
}

impl BlockGeometry {
    /// 16×16 luma macroblock.
    pub const LUMA: Self = Self {
        width: LUMA_BLOCK_DIM,
        height: LUMA_BLOCK_DIM,
        sum_diff_threshold: 512,
        sum_diff_threshold_increased: 600,
    };

    /// 8×8 chroma block of a 4:2:0 macroblock.
    pub const CHROMA: Self = Self {
        width: CHROMA_BLOCK_DIM,
        height: CHROMA_BLOCK_DIM,
        sum_diff_threshold: 8 * 8 * 3 / 2,
        sum_diff_threshold_increased: 8 * 8 * 2,
    };

    /// Chroma geometry for another subsampling (e.g. 8×16 for 4:2:2).
    ///
    /// Thresholds scale with the block area the same way the 8×8 ones do.
    pub fn chroma(width: usize, height: usize) -> Result<Self, DenoiseError> {
        check_dims(BlockRole::Unspecified, width, height)?;
        let area = (width * height) as u32;
        Ok(Self {
            width,
            height,
            sum_diff_threshold: area * 3 / 2,
            sum_diff_threshold_increased: area * 2,
        })
    }

    /// Block width in samples.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Block height in rows.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Limit on `|sum_diff|` for the given strength.
    pub const fn sum_diff_threshold(&self, strength: DenoiseStrength) -> u32 {
        match strength {
            DenoiseStrength::Normal => self.sum_diff_threshold,
            DenoiseStrength::Increased => self.sum_diff_threshold_increased,
        }
    }
}

fn check_dims(role: BlockRole, width: usize, height: usize) -> Result<(), DenoiseError> {
    if width == 0 || height == 0 {
        return Err(DenoiseError::ZeroDimension { role, width, height });
    }
    if width > MAX_BLOCK_DIM || height > MAX_BLOCK_DIM {
        return Err(DenoiseError::DimensionTooLarge {
            role,
            width,
            height,
            max: MAX_BLOCK_DIM,
        });
    }
    Ok(())
}

fn check_view(
    role: BlockRole,
    len: usize,
    width: usize,
    height: usize,
    stride: usize,
) -> Result<(), DenoiseError> {
    check_dims(role, width, height)?;
    if stride < width {
        return Err(DenoiseError::StrideTooSmall { role, stride, width });
    }
    let needed = (height - 1) * stride + width;
    if len < needed {
        return Err(DenoiseError::BufferTooSmall { role, needed, len });
    }
    Ok(())
}

/// Read-only strided view of a block.
#[derive(Debug, Clone, Copy)]
pub struct PixelBlock<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> PixelBlock<'a> {
    /// Wrap `data` as a `width`×`height` block with rows `stride` bytes apart.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, DenoiseError> {
        check_view(BlockRole::Unspecified, data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// View shaped like `geometry`.
    pub fn with_geometry(
        data: &'a [u8],
        geometry: BlockGeometry,
        stride: usize,
    ) -> Result<Self, DenoiseError> {
        Self::new(data, geometry.width, geometry.height, stride)
    }

    /// Block width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between rows in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The `width` samples of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[y * self.stride..][..self.width]
    }

    /// Sample at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.row(y)[x]
    }
}

/// Mutable strided view of a block.
#[derive(Debug)]
pub struct PixelBlockMut<'a> {
    data: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> PixelBlockMut<'a> {
    /// Wrap `data` as a writable `width`×`height` block with rows `stride`
    /// bytes apart.
    pub fn new(
        data: &'a mut [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, DenoiseError> {
        check_view(BlockRole::Unspecified, data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Writable view shaped like `geometry`.
    pub fn with_geometry(
        data: &'a mut [u8],
        geometry: BlockGeometry,
        stride: usize,
    ) -> Result<Self, DenoiseError> {
        Self::new(data, geometry.width, geometry.height, stride)
    }

    /// Block width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between rows in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Reborrow as a read-only view.
    pub fn as_block(&self) -> PixelBlock<'_> {
        PixelBlock {
            data: &*self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    /// The `width` samples of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..][..self.width]
    }

    /// The `width` samples of row `y`, writable.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.data[y * self.stride..][..self.width]
    }

    /// Sample at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.row(y)[x]
    }

    /// Copy every row of `src` into this block. Bytes between rows are left
    /// untouched.
    pub fn copy_from(&mut self, src: &PixelBlock<'_>) {
        debug_assert_eq!((self.width, self.height), (src.width, src.height));
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
    }
}

/// The three buffers of one filter call.
///
/// `source` carries two meanings: on entry it holds the raw samples of the
/// current frame; after a [`FilterDecision::Filtered`] call it holds the
/// denoised samples that become the temporal reference for the next frame.
///
/// [`FilterDecision::Filtered`]: crate::FilterDecision::Filtered
#[derive(Debug)]
pub struct BlockSet<'a> {
    /// Motion-compensated prediction from the previous denoised frame.
    pub prediction: PixelBlock<'a>,
    /// Denoised result for this frame.
    pub output: PixelBlockMut<'a>,
    /// Raw source in, persistent reference out.
    pub source: PixelBlockMut<'a>,
}

impl<'a> BlockSet<'a> {
    /// Bundle three views, checking that they share one logical size.
    pub fn new(
        prediction: PixelBlock<'a>,
        output: PixelBlockMut<'a>,
        source: PixelBlockMut<'a>,
    ) -> Result<Self, DenoiseError> {
        for (role, width, height) in [
            (BlockRole::Output, output.width, output.height),
            (BlockRole::Source, source.width, source.height),
        ] {
            if (width, height) != (prediction.width, prediction.height) {
                return Err(DenoiseError::DimensionMismatch {
                    role,
                    width,
                    height,
                    expected_width: prediction.width,
                    expected_height: prediction.height,
                });
            }
        }
        Ok(Self {
            prediction,
            output,
            source,
        })
    }

    /// Logical width shared by the three views.
    pub fn width(&self) -> usize {
        self.prediction.width
    }

    /// Logical height shared by the three views.
    pub fn height(&self) -> usize {
        self.prediction.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_respect_stride() {
        let data: [u8; 12] = [1, 2, 0, 0, 3, 4, 0, 0, 5, 6, 0, 0];
        let block = PixelBlock::new(&data, 2, 3, 4).unwrap();
        assert_eq!(block.row(0), &[1, 2]);
        assert_eq!(block.row(1), &[3, 4]);
        assert_eq!(block.row(2), &[5, 6]);
        assert_eq!(block.get(1, 2), 6);
    }

    #[test]
    fn last_row_may_end_at_width() {
        // (height - 1) * stride + width bytes is enough
        let data = [0u8; 15 * 32 + 16];
        assert!(PixelBlock::new(&data, 16, 16, 32).is_ok());
        assert_eq!(
            PixelBlock::new(&data[..15 * 32 + 15], 16, 16, 32).unwrap_err(),
            DenoiseError::BufferTooSmall {
                role: BlockRole::Unspecified,
                needed: 15 * 32 + 16,
                len: 15 * 32 + 15,
            }
        );
    }

    #[test]
    fn rejects_bad_geometry() {
        let data = [0u8; 512];
        assert!(matches!(
            PixelBlock::new(&data, 16, 16, 8),
            Err(DenoiseError::StrideTooSmall { stride: 8, width: 16, .. })
        ));
        assert!(matches!(
            PixelBlock::new(&data, 0, 16, 16),
            Err(DenoiseError::ZeroDimension { .. })
        ));
        assert!(matches!(
            PixelBlock::new(&data, 17, 16, 32),
            Err(DenoiseError::DimensionTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn copy_leaves_gap_bytes_alone() {
        let src = [9u8; 8];
        let mut dst = [0u8; 12];
        {
            let mut view = PixelBlockMut::new(&mut dst, 4, 2, 6).unwrap();
            view.copy_from(&PixelBlock::new(&src, 4, 2, 4).unwrap());
        }
        assert_eq!(dst, [9, 9, 9, 9, 0, 0, 9, 9, 9, 9, 0, 0]);
    }

    #[test]
    fn chroma_thresholds_scale_with_area() {
        assert_eq!(BlockGeometry::chroma(8, 8).unwrap(), BlockGeometry::CHROMA);
        let tall = BlockGeometry::chroma(8, 16).unwrap();
        assert_eq!(tall.sum_diff_threshold(DenoiseStrength::Normal), 192);
        assert_eq!(tall.sum_diff_threshold(DenoiseStrength::Increased), 256);
        assert!(BlockGeometry::chroma(8, 32).is_err());
    }

    #[test]
    fn block_set_rejects_mismatched_sizes() {
        let pred = [0u8; 256];
        let mut out = [0u8; 256];
        let mut src = [0u8; 256];
        let set = BlockSet::new(
            PixelBlock::new(&pred, 16, 16, 16).unwrap(),
            PixelBlockMut::new(&mut out, 8, 8, 16).unwrap(),
            PixelBlockMut::new(&mut src, 16, 16, 16).unwrap(),
        );
        assert!(matches!(
            set,
            Err(DenoiseError::DimensionMismatch {
                role: BlockRole::Output,
                width: 8,
                height: 8,
                ..
            })
        ));
    }
}
