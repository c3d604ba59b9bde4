//! A scripted render service.
//!
//! [`FakeRenderService`] mimics a host renderer: it tracks the posed scene,
//! returns flat-colored frames whose color encodes the pose, and fails on
//! demand.

use std::collections::BTreeMap;

use spritegen_batch::{FrameImage, RenderService, RenderServiceError, SceneState};

/// A call made by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SetFrame { rig: String, clip: String, frame: i32 },
    SetRotation { object: String, degrees: f64 },
    Render,
    Restore,
}

#[derive(Debug, Clone)]
struct ScheduledFailure {
    /// 1-based render call at which failures start.
    at: usize,
    remaining: usize,
    error: RenderServiceError,
}

/// Render service double for integration tests.
#[derive(Debug, Clone)]
pub struct FakeRenderService {
    frame_size: (u32, u32),
    clip_sizes: BTreeMap<String, (u32, u32)>,
    render_sizes: BTreeMap<usize, (u32, u32)>,
    state: SceneState,
    current_rig: Option<String>,
    calls: Vec<RenderCall>,
    renders: usize,
    failure: Option<ScheduledFailure>,
}

impl FakeRenderService {
    /// Creates a service rendering `width` x `height` frames.
    ///
    /// The scene starts at frame 1 with `knight` and `archer` bound to
    /// `idle` and unrotated, so restoration is observable.
    pub fn new(width: u32, height: u32) -> Self {
        let mut state = SceneState {
            frame: 1,
            ..Default::default()
        };
        for rig in ["knight", "archer"] {
            state
                .active_clips
                .insert(rig.to_string(), Some("idle".to_string()));
            state.rotations.insert(rig.to_string(), 0.0);
        }
        Self {
            frame_size: (width, height),
            clip_sizes: BTreeMap::new(),
            render_sizes: BTreeMap::new(),
            state,
            current_rig: None,
            calls: Vec::new(),
            renders: 0,
            failure: None,
        }
    }

    /// Renders frames of `clip` at a different size.
    pub fn with_clip_size(mut self, clip: &str, width: u32, height: u32) -> Self {
        self.clip_sizes.insert(clip.to_string(), (width, height));
        self
    }

    /// Renders only the `call`-th frame (1-based) at a different size.
    pub fn with_render_size(mut self, call: usize, width: u32, height: u32) -> Self {
        self.render_sizes.insert(call, (width, height));
        self
    }

    /// Fails `times` render calls starting at the `at`-th (1-based).
    pub fn fail_at(mut self, at: usize, times: usize, error: RenderServiceError) -> Self {
        self.failure = Some(ScheduledFailure {
            at,
            remaining: times,
            error,
        });
        self
    }

    /// Color of a frame rendered at `frame` with the rig turned `degrees`.
    pub fn color_for(frame: i32, degrees: f64) -> [u8; 4] {
        let turn = (degrees.rem_euclid(360.0) / 2.0).round() as u8;
        [frame.rem_euclid(256) as u8, turn, 64, 255]
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Number of render calls, failed ones included.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn scene(&self) -> &SceneState {
        &self.state
    }

    fn current_size(&self) -> (u32, u32) {
        if let Some(size) = self.render_sizes.get(&self.renders) {
            return *size;
        }
        self.current_rig
            .as_ref()
            .and_then(|rig| self.state.active_clips.get(rig))
            .and_then(|clip| clip.as_ref())
            .and_then(|clip| self.clip_sizes.get(clip))
            .copied()
            .unwrap_or(self.frame_size)
    }

    fn current_rotation(&self) -> f64 {
        self.current_rig
            .as_ref()
            .and_then(|rig| self.state.rotations.get(rig))
            .copied()
            .unwrap_or(0.0)
    }
}

impl RenderService for FakeRenderService {
    fn set_frame(&mut self, rig: &str, clip: &str, frame: i32) -> Result<(), RenderServiceError> {
        self.calls.push(RenderCall::SetFrame {
            rig: rig.to_string(),
            clip: clip.to_string(),
            frame,
        });
        self.state
            .active_clips
            .insert(rig.to_string(), Some(clip.to_string()));
        self.state.frame = frame;
        self.current_rig = Some(rig.to_string());
        Ok(())
    }

    fn set_rotation(&mut self, object: &str, degrees: f64) -> Result<(), RenderServiceError> {
        self.calls.push(RenderCall::SetRotation {
            object: object.to_string(),
            degrees,
        });
        self.state.rotations.insert(object.to_string(), degrees);
        Ok(())
    }

    fn render_current_frame(&mut self) -> Result<FrameImage, RenderServiceError> {
        self.calls.push(RenderCall::Render);
        self.renders += 1;

        if let Some(failure) = &mut self.failure {
            if self.renders >= failure.at && failure.remaining > 0 {
                failure.remaining -= 1;
                return Err(failure.error.clone());
            }
        }

        let (width, height) = self.current_size();
        let color = Self::color_for(self.state.frame, self.current_rotation());
        Ok(FrameImage::filled(width, height, color))
    }

    fn capture_state(&self) -> SceneState {
        self.state.clone()
    }

    fn restore_state(&mut self, state: &SceneState) {
        self.calls.push(RenderCall::Restore);
        self.state = state.clone();
        self.current_rig = None;
    }
}
