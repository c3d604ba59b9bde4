//! Progress reporting.

use crate::executor::{BatchState, SheetRecord};

/// Snapshot of a running batch, sent after every rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress<'a> {
    pub rig: &'a str,
    pub clip: &'a str,
    pub direction: u32,
    pub direction_count: u32,
    /// Scene frame just rendered.
    pub frame: i32,
    /// Position of `frame` within the clip's rendered frames.
    pub frame_index: u32,
    pub frames_in_clip: u32,
    pub pair_index: usize,
    pub pair_count: usize,
    pub frames_done: u64,
    pub frames_total: u64,
    /// Wall-clock time of the last render call, retries included.
    pub last_frame_secs: f64,
}

impl Progress<'_> {
    /// Completed share of the run, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 0.0;
        }
        self.frames_done as f64 / self.frames_total as f64
    }
}

/// Receives progress from the executor.
///
/// Called on the driving thread inside `tick()`, so implementations must
/// return quickly.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: &Progress<'_>);

    fn on_sheet_written(&mut self, _sheet: &SheetRecord) {}

    fn on_finished(&mut self, _state: BatchState) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&mut self, _progress: &Progress<'_>) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(&Progress<'_>),
{
    fn on_progress(&mut self, progress: &Progress<'_>) {
        self(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(done: u64, total: u64) -> Progress<'static> {
        Progress {
            rig: "knight",
            clip: "walk",
            direction: 0,
            direction_count: 4,
            frame: 0,
            frame_index: 0,
            frames_in_clip: 8,
            pair_index: 0,
            pair_count: 1,
            frames_done: done,
            frames_total: total,
            last_frame_secs: 0.1,
        }
    }

    #[test]
    fn test_fraction() {
        assert_eq!(progress(8, 32).fraction(), 0.25);
        assert_eq!(progress(0, 0).fraction(), 0.0);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |p: &Progress<'_>| seen.push(p.frames_done);
            observer.on_progress(&progress(1, 2));
            observer.on_progress(&progress(2, 2));
            observer.on_finished(BatchState::Completed);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
