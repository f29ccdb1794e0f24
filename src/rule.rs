//! Per-pixel adjustment rule shared by every filter implementation.
//!
//! The rule looks at `diff = prediction - source` for one pixel and decides
//! how far to pull the source toward the prediction:
//!
//! | band  | `abs(diff)` | correction                  |
//! |-------|-------------|-----------------------------|
//! | match | 0..=3       | full diff                   |
//! | low   | 4..=7       | `min(abs(diff), caps[0])`   |
//! | mid   | 8..=15      | `min(abs(diff), caps[1])`   |
//! | high  | 16..        | `min(abs(diff), caps[2])`   |
//!
//! Caps are 4/5/7 at normal strength and 5/6/8 when denoising is increased.
//! Every cap is above the match band's upper bound, so the whole table is
//! `min(abs(diff), cap(band))`, which is what the SIMD kernels evaluate.
//!
//! Blocks whose motion magnitude exceeds [`MOTION_MAGNITUDE_THRESHOLD`] are not
//! filtered at all.

/// Motion magnitude above which the prediction is considered unreliable.
pub const MOTION_MAGNITUDE_THRESHOLD: u32 = 8 * 3;

/// Smallest `abs(diff)` of the low band. Anything below is pulled all the
/// way to the prediction.
pub const LOW_BAND_MIN_DIFF: u8 = 4;

/// Smallest `abs(diff)` of the mid band.
pub const MID_BAND_MIN_DIFF: u8 = 8;

/// Smallest `abs(diff)` of the high band.
pub const HIGH_BAND_MIN_DIFF: u8 = 16;

const NORMAL_CAPS: [u8; 3] = [4, 5, 7];
const INCREASED_CAPS: [u8; 3] = [5, 6, 8];

/// Weak-pass deltas at or above this value mean the block is copied instead.
pub const WEAK_DELTA_LIMIT: u8 = 4;

/// Selects the per-band correction caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DenoiseStrength {
    /// Conservative caps.
    #[default]
    Normal,
    /// Larger caps: smoother output at some cost in fidelity.
    Increased,
}

impl From<bool> for DenoiseStrength {
    /// `true` is the encoder's "increase denoising" flag.
    fn from(increase: bool) -> Self {
        if increase {
            DenoiseStrength::Increased
        } else {
            DenoiseStrength::Normal
        }
    }
}

/// Classification of `abs(diff)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    /// Prediction and source agree up to noise.
    Match,
    /// Small disagreement.
    Low,
    /// Moderate disagreement.
    Mid,
    /// Large disagreement.
    High,
}

impl Band {
    /// Band of an absolute difference.
    #[inline]
    pub const fn classify(abs_diff: u8) -> Self {
        if abs_diff < LOW_BAND_MIN_DIFF {
            Band::Match
        } else if abs_diff < MID_BAND_MIN_DIFF {
            Band::Low
        } else if abs_diff < HIGH_BAND_MIN_DIFF {
            Band::Mid
        } else {
            Band::High
        }
    }
}

/// Per-pixel correction policy for one block.
///
/// Holds nothing but the caps picked by the strength; it is cheap to copy
/// into every kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentRule {
    caps: [u8; 3],
}

impl AdjustmentRule {
    /// Rule with the caps for `strength`.
    pub const fn new(strength: DenoiseStrength) -> Self {
        let caps = match strength {
            DenoiseStrength::Normal => NORMAL_CAPS,
            DenoiseStrength::Increased => INCREASED_CAPS,
        };
        Self { caps }
    }

    /// Rule for a block, or `None` when motion is too large to filter.
    #[inline]
    pub const fn for_block(motion_magnitude: u32, strength: DenoiseStrength) -> Option<Self> {
        if motion_magnitude > MOTION_MAGNITUDE_THRESHOLD {
            None
        } else {
            Some(Self::new(strength))
        }
    }

    /// Low, mid and high band caps.
    #[inline]
    pub const fn caps(&self) -> [u8; 3] {
        self.caps
    }

    /// Unsigned size of the correction for an absolute difference.
    #[inline]
    pub const fn magnitude(&self, abs_diff: u8) -> u8 {
        let cap = match Band::classify(abs_diff) {
            Band::Match => return abs_diff,
            Band::Low => self.caps[0],
            Band::Mid => self.caps[1],
            Band::High => self.caps[2],
        };
        if abs_diff < cap {
            abs_diff
        } else {
            cap
        }
    }

    /// Signed correction for `diff = prediction - source`.
    #[inline]
    pub const fn correction(&self, diff: i16) -> i16 {
        let abs = diff.unsigned_abs();
        let abs = if abs > 255 { 255 } else { abs as u8 };
        let magnitude = self.magnitude(abs) as i16;
        if diff < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Denoised value of one pixel and the signed correction applied to it.
    ///
    /// The correction is returned as `i8` for the column accumulator; its
    /// magnitude never exceeds the high-band cap.
    #[inline]
    pub fn apply(&self, source: u8, prediction: u8) -> (u8, i8) {
        let magnitude = self.magnitude(source.abs_diff(prediction));
        if prediction > source {
            (source.saturating_add(magnitude), magnitude as i8)
        } else {
            (source.saturating_sub(magnitude), -(magnitude as i8))
        }
    }
}

/// Correction for one pixel of a block with the given motion and strength.
///
/// Zero when the block is motion-gated.
pub fn adjustment(diff: i16, motion_magnitude: u32, strength: DenoiseStrength) -> i16 {
    match AdjustmentRule::for_block(motion_magnitude, strength) {
        Some(rule) => rule.correction(diff),
        None => 0,
    }
}

/// Per-column total of applied corrections.
///
/// Each lane saturates to the `i8` range after every update, exactly like a
/// 16-lane signed-byte SIMD register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnSums([i8; 16]);

impl ColumnSums {
    /// All lanes zero.
    pub const fn new() -> Self {
        Self([0; 16])
    }

    /// Sums loaded from SIMD lanes.
    pub const fn from_lanes(lanes: [i8; 16]) -> Self {
        Self(lanes)
    }

    /// Raw lanes, for loading into a SIMD register.
    pub const fn lanes(&self) -> [i8; 16] {
        self.0
    }

    /// Saturating add to column `x`.
    #[inline]
    pub fn add(&mut self, x: usize, value: i8) {
        self.0[x] = self.0[x].saturating_add(value);
    }

    /// Saturating subtract from column `x`.
    #[inline]
    pub fn sub(&mut self, x: usize, value: i8) {
        self.0[x] = self.0[x].saturating_sub(value);
    }

    /// Block-level `sum_diff`.
    pub fn total(&self) -> i32 {
        self.0.iter().map(|&v| i32::from(v)).sum()
    }
}

/// Per-pixel cap of the weak pass run when `|sum_diff|` exceeds `threshold`.
///
/// `None` when the excess is too large for the weak pass to help; the block
/// is then copied unfiltered.
pub fn weak_pass_delta(abs_sum_diff: u32, threshold: u32) -> Option<u8> {
    debug_assert!(abs_sum_diff > threshold);
    let delta = ((abs_sum_diff - threshold) >> 8) + 1;
    if delta < u32::from(WEAK_DELTA_LIMIT) {
        Some(delta as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands() {
        assert_eq!(Band::classify(0), Band::Match);
        assert_eq!(Band::classify(3), Band::Match);
        assert_eq!(Band::classify(4), Band::Low);
        assert_eq!(Band::classify(7), Band::Low);
        assert_eq!(Band::classify(8), Band::Mid);
        assert_eq!(Band::classify(15), Band::Mid);
        assert_eq!(Band::classify(16), Band::High);
        assert_eq!(Band::classify(255), Band::High);
    }

    #[test]
    fn normal_corrections() {
        let rule = AdjustmentRule::new(DenoiseStrength::Normal);
        let expected: [(i16, i16); 12] = [
            (0, 0),
            (1, 1),
            (-3, -3),
            (4, 4),
            (-5, -4),
            (7, 4),
            (8, 5),
            (-15, -5),
            (16, 7),
            (-19, -7),
            (255, 7),
            (-255, -7),
        ];
        for (diff, c) in expected {
            assert_eq!(rule.correction(diff), c, "diff {diff}");
        }
    }

    #[test]
    fn increased_corrections() {
        let rule = AdjustmentRule::new(DenoiseStrength::Increased);
        let expected: [(i16, i16); 9] = [
            (3, 3),
            (4, 4),
            (5, 5),
            (-7, -5),
            (8, 6),
            (15, 6),
            (-16, -8),
            (100, 8),
            (-255, -8),
        ];
        for (diff, c) in expected {
            assert_eq!(rule.correction(diff), c, "diff {diff}");
        }
    }

    #[test]
    fn increased_is_never_weaker() {
        let normal = AdjustmentRule::new(DenoiseStrength::Normal);
        let increased = AdjustmentRule::new(DenoiseStrength::Increased);
        for abs in 0..=255u8 {
            assert!(increased.magnitude(abs) >= normal.magnitude(abs), "abs {abs}");
        }
    }

    #[test]
    fn correction_never_overshoots() {
        for strength in [DenoiseStrength::Normal, DenoiseStrength::Increased] {
            let rule = AdjustmentRule::new(strength);
            for diff in -255i16..=255 {
                let c = rule.correction(diff);
                assert!(c.abs() <= diff.abs());
                assert!(c == 0 || c.signum() == diff.signum());
            }
        }
    }

    #[test]
    fn apply_clamps_and_reports_sign() {
        let rule = AdjustmentRule::new(DenoiseStrength::Increased);
        assert_eq!(rule.apply(0, 255), (8, 8));
        assert_eq!(rule.apply(255, 0), (247, -8));
        assert_eq!(rule.apply(100, 102), (102, 2));
        assert_eq!(rule.apply(100, 100), (100, 0));
    }

    #[test]
    fn motion_gate_is_strict() {
        let gate = MOTION_MAGNITUDE_THRESHOLD;
        assert!(AdjustmentRule::for_block(gate, DenoiseStrength::Normal).is_some());
        assert!(AdjustmentRule::for_block(gate + 1, DenoiseStrength::Normal).is_none());
        assert_eq!(adjustment(10, gate + 1, DenoiseStrength::Increased), 0);
        assert_eq!(adjustment(10, 0, DenoiseStrength::Increased), 6);
    }

    #[test]
    fn column_sums_saturate_per_update() {
        let mut sums = ColumnSums::new();
        for _ in 0..20 {
            sums.add(0, 8);
        }
        assert_eq!(sums.lanes()[0], 127);
        sums.sub(0, 8);
        assert_eq!(sums.lanes()[0], 119);
        for _ in 0..40 {
            sums.sub(1, 7);
        }
        assert_eq!(sums.lanes()[1], -128);
        assert_eq!(sums.total(), 119 - 128);
    }

    #[test]
    fn weak_delta() {
        assert_eq!(weak_pass_delta(513, 512), Some(1));
        assert_eq!(weak_pass_delta(512 + 256, 512), Some(2));
        assert_eq!(weak_pass_delta(512 + 767, 512), Some(3));
        assert_eq!(weak_pass_delta(512 + 768, 512), None);
    }
}
