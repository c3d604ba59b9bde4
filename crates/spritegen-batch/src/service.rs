//! The host renderer seam.
//!
//! The executor never talks to a 3D engine directly. It positions the scene
//! and asks for pixels through [`RenderService`], and it snapshots and
//! restores the scene around every run through the same trait.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::FrameImage;

/// Whether a render failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderErrorKind {
    /// The same call may succeed if repeated (device busy, timeout).
    Transient,
    /// Repeating the call will not help.
    Fatal,
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderErrorKind::Transient => write!(f, "transient"),
            RenderErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Error reported by a [`RenderService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} render error: {message}")]
pub struct RenderServiceError {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl RenderServiceError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Transient, message)
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Fatal, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == RenderErrorKind::Transient
    }
}

/// Scene state the executor must put back when a run ends.
///
/// Covers everything a run mutates: each rig's active clip, the current
/// frame, and the rotation of every object the run turned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    /// Active clip per rig id. `None` means the rig had no clip assigned.
    pub active_clips: BTreeMap<String, Option<String>>,
    /// Scene frame.
    pub frame: i32,
    /// Z rotation in degrees per object id.
    pub rotations: BTreeMap<String, f64>,
}

/// Renders frames on behalf of the batch executor.
///
/// All calls happen on the thread driving the executor, at most one render
/// per tick.
pub trait RenderService {
    /// Assigns `clip` to `rig` and moves the scene to `frame`.
    fn set_frame(&mut self, rig: &str, clip: &str, frame: i32) -> Result<(), RenderServiceError>;

    /// Sets the absolute Z rotation of `object`, in degrees.
    fn set_rotation(&mut self, object: &str, degrees: f64) -> Result<(), RenderServiceError>;

    /// Renders the scene as currently posed.
    fn render_current_frame(&mut self) -> Result<FrameImage, RenderServiceError>;

    /// Snapshots everything a run may change.
    fn capture_state(&self) -> SceneState;

    /// Puts a snapshot back.
    fn restore_state(&mut self, state: &SceneState);
}
