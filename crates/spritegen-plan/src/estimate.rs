//! Workload estimation.
//!
//! [`estimate`] is a pure function of the plan, the direction spec, the
//! frame step, and the render history. It is cheap enough to call after
//! every plan edit.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::direction::DirectionSpec;
use crate::grid::SheetGrid;
use crate::plan::PlanModel;

/// Default number of samples kept by [`RenderHistory`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 16;

/// Estimated wall-clock time for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seconds", rename_all = "snake_case")]
pub enum TimeEstimate {
    /// No render history yet.
    Unknown,
    /// Seconds, extrapolated from history.
    Seconds(f64),
}

impl TimeEstimate {
    /// Returns the estimate in seconds, if known.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            TimeEstimate::Unknown => None,
            TimeEstimate::Seconds(s) => Some(*s),
        }
    }
}

/// Frames, sheets, and time for the current plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadEstimate {
    pub total_frames: u64,
    pub total_sheets: u32,
    pub time: TimeEstimate,
}

/// One finished run: how many frames it rendered and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSample {
    pub frames: u64,
    pub elapsed_secs: f64,
}

/// Rolling window of recent render samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderHistory {
    samples: VecDeque<RenderSample>,
    capacity: usize,
}

impl Default for RenderHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RenderHistory {
    /// Creates an empty history keeping at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Adds a sample, evicting the oldest when full. Samples with no frames
    /// or a non-finite or negative duration are ignored.
    pub fn record(&mut self, sample: RenderSample) {
        if sample.frames == 0 || !sample.elapsed_secs.is_finite() || sample.elapsed_secs < 0.0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Returns true if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &RenderSample> {
        self.samples.iter()
    }

    /// Mean seconds per frame across all samples, weighted by frame count.
    pub fn seconds_per_frame(&self) -> Option<f64> {
        let frames: u64 = self.samples.iter().map(|s| s.frames).sum();
        if frames == 0 {
            return None;
        }
        let elapsed: f64 = self.samples.iter().map(|s| s.elapsed_secs).sum();
        Some(elapsed / frames as f64)
    }
}

/// Estimates the workload of a plan.
///
/// frames = Σ `directions × ceil((end − start + 1) / frame_step)` over every
/// enabled clip of every enabled rig; sheets = number of such pairs. The
/// time is [`TimeEstimate::Unknown`] until the history holds a sample.
pub fn estimate(
    plan: &PlanModel,
    directions: &DirectionSpec,
    frame_step: u32,
    history: &RenderHistory,
) -> WorkloadEstimate {
    let mut total_frames: u64 = 0;
    let mut total_sheets: u32 = 0;

    for (_, clip) in plan.active_pairs() {
        let per_direction = clip.frame_range(frame_step).stepped_count() as u64;
        total_frames += per_direction * directions.count() as u64;
        total_sheets += 1;
    }

    let time = match history.seconds_per_frame() {
        Some(spf) => TimeEstimate::Seconds(spf * total_frames as f64),
        None => TimeEstimate::Unknown,
    };

    WorkloadEstimate {
        total_frames,
        total_sheets,
        time,
    }
}

/// Largest sheet grid the plan will produce, by pixel area per frame cell.
///
/// Returns `None` when nothing is enabled.
pub fn max_sheet_grid(
    plan: &PlanModel,
    directions: &DirectionSpec,
    frame_step: u32,
    rows_per_direction: u32,
) -> Option<SheetGrid> {
    plan.active_pairs()
        .map(|(_, clip)| {
            SheetGrid::new(
                directions.count(),
                clip.frame_range(frame_step).rendered_count(),
                rows_per_direction,
            )
        })
        .max_by_key(|grid| (grid.columns as u64 * grid.rows as u64, grid.columns))
}

/// Pixel size of the largest sheet for a given frame size, or `(0, 0)`.
pub fn max_sheet_size(
    plan: &PlanModel,
    directions: &DirectionSpec,
    frame_step: u32,
    rows_per_direction: u32,
    frame_width: u32,
    frame_height: u32,
) -> (u32, u32) {
    max_sheet_grid(plan, directions, frame_step, rows_per_direction)
        .map(|grid| grid.pixel_size(frame_width, frame_height))
        .unwrap_or((0, 0))
}
