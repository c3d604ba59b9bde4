//! Error types for batch execution.

use std::path::PathBuf;

use spritegen_plan::{BackendError, PlanError};
use thiserror::Error;

use crate::executor::BatchState;
use crate::png::PngError;
use crate::service::RenderServiceError;

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur while starting or running a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No enabled rig has an enabled clip.
    #[error("Nothing to render: the plan has no enabled rig with an enabled clip")]
    EmptyPlan,

    /// Settings or plan data were rejected.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Rotation targets the camera but the rig has none and no default is set.
    #[error("Rig '{rig}' has no camera and no default camera is configured")]
    MissingCamera { rig: String },

    /// The executor is not in a state that allows the call.
    #[error("Cannot {action} while the batch is {state}")]
    InvalidState {
        action: &'static str,
        state: BatchState,
    },

    /// The render service failed.
    #[error("Render failed for rig '{rig}', clip '{clip}', direction {direction}, frame {frame}: {source}")]
    RenderService {
        rig: String,
        clip: String,
        direction: u32,
        frame: i32,
        #[source]
        source: RenderServiceError,
    },

    /// A rendered frame's size differs from the first frame of its sheet.
    #[error(
        "Frame size mismatch for rig '{rig}', clip '{clip}', direction {direction}, frame index {frame_index}: expected {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        rig: String,
        clip: String,
        direction: u32,
        frame_index: u32,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A sheet was requested before every frame was rendered.
    #[error("Missing frame for rig '{rig}', clip '{clip}', direction {direction}, frame index {frame_index}")]
    IncompleteFrameSet {
        rig: String,
        clip: String,
        direction: u32,
        frame_index: u32,
    },

    /// Pixel data does not match the stated dimensions.
    #[error("Invalid image: {message}")]
    InvalidImage { message: String },

    /// Failed to write or read a stored file.
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding or decoding failed.
    #[error("PNG error at {path}: {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: PngError,
    },

    /// Failed to serialize animation metadata.
    #[error("Failed to serialize metadata: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// A clip selected for rendering has no frames to render.
    #[error("Clip '{clip}' on rig '{rig}' has no frames in {start}..={end}")]
    EmptyFrameRange {
        rig: String,
        clip: String,
        start: i32,
        end: i32,
    },

    /// Two pairs or rigs would write the same output file.
    #[error("Rig '{rig}', clip '{clip}' would overwrite {path} written for {other}")]
    OutputCollision {
        rig: String,
        clip: String,
        path: PathBuf,
        other: String,
    },
}

impl BatchError {
    /// Creates a new invalid image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Creates a new storage error.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error ended a run (as opposed to refusing to start one).
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            BatchError::RenderService { .. }
                | BatchError::DimensionMismatch { .. }
                | BatchError::IncompleteFrameSet { .. }
                | BatchError::InvalidImage { .. }
                | BatchError::Storage { .. }
                | BatchError::Png { .. }
                | BatchError::SerializeFailed(_)
        )
    }
}

impl BackendError for BatchError {
    fn code(&self) -> &'static str {
        match self {
            BatchError::EmptyPlan => "BATCH_001",
            BatchError::Plan(inner) => inner.code(),
            BatchError::MissingCamera { .. } => "BATCH_002",
            BatchError::InvalidState { .. } => "BATCH_003",
            BatchError::RenderService { .. } => "BATCH_004",
            BatchError::DimensionMismatch { .. } => "BATCH_005",
            BatchError::IncompleteFrameSet { .. } => "BATCH_006",
            BatchError::InvalidImage { .. } => "BATCH_007",
            BatchError::Storage { .. } => "BATCH_008",
            BatchError::Png { .. } => "BATCH_009",
            BatchError::SerializeFailed(_) => "BATCH_010",
            BatchError::EmptyFrameRange { .. } => "BATCH_011",
            BatchError::OutputCollision { .. } => "BATCH_012",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            BatchError::Plan(inner) => inner.category(),
            _ => "batch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RenderErrorKind;

    #[test]
    fn test_error_display() {
        let err = BatchError::EmptyPlan;
        assert!(err.to_string().contains("Nothing to render"));

        let err = BatchError::DimensionMismatch {
            rig: "knight".to_string(),
            clip: "walk".to_string(),
            direction: 2,
            frame_index: 5,
            expected: (64, 64),
            actual: (32, 64),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 64x64, got 32x64"));
        assert!(msg.contains("direction 2"));
    }

    #[test]
    fn test_render_error_context() {
        let err = BatchError::RenderService {
            rig: "knight".to_string(),
            clip: "walk".to_string(),
            direction: 1,
            frame: 12,
            source: RenderServiceError::new(RenderErrorKind::Fatal, "GPU lost"),
        };
        let msg = err.to_string();
        assert!(msg.contains("knight"));
        assert!(msg.contains("frame 12"));
        assert!(msg.contains("GPU lost"));
        assert!(err.is_run_fatal());
        assert_eq!(err.code(), "BATCH_004");
    }

    #[test]
    fn test_plan_errors_keep_their_code() {
        let err: BatchError = PlanError::invalid_settings("directions", "must be at least 1").into();
        assert_eq!(err.code(), "PLAN_005");
        assert_eq!(err.category(), "plan");
        assert!(!err.is_run_fatal());
    }

    #[test]
    fn test_plan_time_errors_are_not_run_fatal() {
        let err = BatchError::EmptyFrameRange {
            rig: "knight".to_string(),
            clip: "walk".to_string(),
            start: 3,
            end: 2,
        };
        assert_eq!(err.code(), "BATCH_011");
        assert!(!err.is_run_fatal());

        let err = BatchError::OutputCollision {
            rig: "a_b".to_string(),
            clip: "idle".to_string(),
            path: PathBuf::from("spritesheets/a_b_idle.png"),
            other: "a b/idle".to_string(),
        };
        assert_eq!(err.code(), "BATCH_012");
        assert!(err.to_string().contains("a_b_idle.png"));
        assert!(!err.is_run_fatal());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = BatchError::InvalidState {
            action: "start",
            state: BatchState::Running,
        };
        assert_eq!(err.to_string(), "Cannot start while the batch is running");
    }
}
