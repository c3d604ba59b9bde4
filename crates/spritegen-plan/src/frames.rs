//! Frame sampling for a clip range.

use serde::{Deserialize, Serialize};

/// An inclusive frame range sampled every `step` frames.
///
/// The end frame is always part of the sequence, even when it falls short
/// of a full step, so the final pose of a clip is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i32,
    pub end: i32,
    pub step: u32,
}

impl FrameRange {
    /// Creates a range. A zero step is treated as 1.
    pub fn new(start: i32, end: i32, step: u32) -> Self {
        Self {
            start,
            end,
            step: step.max(1),
        }
    }

    /// Number of frames in the inclusive range, before sampling.
    ///
    /// Computed in 64 bits: `i32::MIN..=i32::MAX` holds 2^32 frames.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            (self.end as i64 - self.start as i64 + 1) as u64
        }
    }

    /// Returns true if the range contains no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `ceil(len / step)`: the planning count used for workload estimates.
    /// Saturates at `u32::MAX`.
    pub fn stepped_count(&self) -> u32 {
        saturate(self.len().div_ceil(self.step as u64))
    }

    /// Length of [`FrameRange::frames`], computed without allocating.
    /// Saturates at `u32::MAX`.
    pub fn rendered_count(&self) -> u32 {
        let len = self.len();
        if len == 0 {
            return 0;
        }
        let stepped = len.div_ceil(self.step as u64);
        let on_step = (len - 1) % self.step as u64 == 0;
        saturate(stepped + u64::from(!on_step))
    }

    /// The frames actually rendered, with the end frame forced in.
    pub fn frames(&self) -> Vec<i32> {
        if self.is_empty() {
            return Vec::new();
        }
        let step = self.step as i64;
        let mut frames: Vec<i32> = (self.start as i64..=self.end as i64)
            .step_by(step as usize)
            .map(|f| f as i32)
            .collect();
        if frames.last() != Some(&self.end) {
            frames.push(self.end);
        }
        frames
    }
}

fn saturate(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
