//! Error types for discovery, plan editing, and settings.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Trait implemented by every spritegen error enum so hosts can report
/// failures uniformly.
pub trait BackendError: std::error::Error {
    /// Get the error code for reporting.
    ///
    /// Returns a static string like "PLAN_001" or "BATCH_004". These codes
    /// are stable and can be used for programmatic error handling.
    fn code(&self) -> &'static str;

    /// Get a human-readable message describing the error.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Get the error category for grouping related errors.
    fn category(&self) -> &'static str;
}

/// Errors produced while discovering clips, editing a plan, or loading settings.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A clip has no keyframes, so it has no natural frame range.
    #[error("Clip '{clip}' on rig '{rig}' has no keyframes")]
    EmptyClip { rig: String, clip: String },

    /// A frame range edit was rejected.
    #[error("Invalid frame range {start}..={end} for clip '{clip}' on rig '{rig}': {reason}")]
    InvalidRange {
        rig: String,
        clip: String,
        start: i32,
        end: i32,
        reason: String,
    },

    /// The rig is not part of the plan.
    #[error("Unknown rig '{rig}'")]
    UnknownRig { rig: String },

    /// A rig id appears twice in a plan.
    #[error("Rig '{rig}' is already in the plan")]
    DuplicateRig { rig: String },

    /// The clip is not part of the rig's plan (or not present in the scene).
    #[error("Unknown clip '{clip}' on rig '{rig}'")]
    UnknownClip { rig: String, clip: String },

    /// A batch setting is out of its allowed range.
    #[error("Invalid setting '{field}': {message}")]
    InvalidSettings { field: &'static str, message: String },

    /// Failed to read a settings or scene file.
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("JSON error: {0}")]
    Json(#[source] serde_json::Error),
}

impl PlanError {
    /// Creates a new invalid range error.
    pub fn invalid_range(
        rig: impl Into<String>,
        clip: impl Into<String>,
        start: i32,
        end: i32,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRange {
            rig: rig.into(),
            clip: clip.into(),
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Creates a new unknown rig error.
    pub fn unknown_rig(rig: impl Into<String>) -> Self {
        Self::UnknownRig { rig: rig.into() }
    }

    /// Creates a new unknown clip error.
    pub fn unknown_clip(rig: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::UnknownClip {
            rig: rig.into(),
            clip: clip.into(),
        }
    }

    /// Creates a new invalid settings error.
    pub fn invalid_settings(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            field,
            message: message.into(),
        }
    }
}

impl BackendError for PlanError {
    fn code(&self) -> &'static str {
        match self {
            PlanError::EmptyClip { .. } => "PLAN_001",
            PlanError::InvalidRange { .. } => "PLAN_002",
            PlanError::UnknownRig { .. } => "PLAN_003",
            PlanError::UnknownClip { .. } => "PLAN_004",
            PlanError::InvalidSettings { .. } => "PLAN_005",
            PlanError::ReadFailed { .. } => "PLAN_006",
            PlanError::Json(_) => "PLAN_007",
            PlanError::DuplicateRig { .. } => "PLAN_008",
        }
    }

    fn category(&self) -> &'static str {
        "plan"
    }
}
