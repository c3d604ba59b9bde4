//! Batch settings shared by planning, estimation, and execution.
//!
//! Settings are an explicit context object passed to every stage. They can
//! be built in code with the `with_*` setters or loaded from JSON; missing
//! fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::direction::DirectionSpec;
use crate::error::{PlanError, PlanResult};

/// Highest frame number a scene may use. Range edits outside
/// `[-frame_limit, frame_limit]` are rejected. Also the largest
/// `frame_limit` a plan accepts.
pub const DEFAULT_FRAME_LIMIT: i32 = 1_048_574;

/// Upper bound on the number of directions.
pub const MAX_DIRECTIONS: u32 = 64;

/// What gets rotated for each direction during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationTarget {
    /// Rotate the rig object around its vertical axis.
    #[default]
    Rig,
    /// Orbit the camera instead, leaving the rig untouched.
    Camera,
}

impl RotationTarget {
    /// Returns the target as a string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationTarget::Rig => "rig",
            RotationTarget::Camera => "camera",
        }
    }
}

/// Settings for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSettings {
    /// Number of view directions (e.g. 8 for S, SE, E, ...).
    #[serde(default = "default_directions")]
    pub directions: u32,

    /// Render every Nth frame (1 = every frame).
    #[serde(default = "default_frame_step")]
    pub frame_step: u32,

    /// Number of sheet rows each direction's frames wrap across.
    #[serde(default = "default_rows_per_direction")]
    pub rows_per_direction: u32,

    /// Whether directions rotate the rig or the camera.
    #[serde(default)]
    pub rotation_target: RotationTarget,

    /// Camera used by rigs that do not name their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,

    /// Output directory for sheets and metadata, relative to the storage root.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for per-frame temporary images, relative to the storage root.
    #[serde(default = "default_temp_subdir")]
    pub temp_subdir: PathBuf,

    /// Largest absolute frame number accepted by range edits.
    #[serde(default = "default_frame_limit")]
    pub frame_limit: i32,

    /// Default clip bounds come from keyframes (true) or the layer strip (false).
    #[serde(default = "default_true")]
    pub use_clip_range: bool,

    /// Playback speed written into animation metadata.
    #[serde(default = "default_metadata_fps")]
    pub metadata_fps: u32,

    /// Also write a Godot `SpriteFrames` resource next to the JSON metadata.
    #[serde(default = "default_true")]
    pub godot_export: bool,

    /// Resource path prefix for sheet textures inside the Godot project.
    #[serde(default = "default_godot_resource_dir")]
    pub godot_resource_dir: String,

    /// Retries for transient render errors before the run fails.
    #[serde(default)]
    pub render_retries: u32,
}

fn default_directions() -> u32 {
    8
}

fn default_frame_step() -> u32 {
    1
}

fn default_rows_per_direction() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("spritesheets")
}

fn default_temp_subdir() -> PathBuf {
    PathBuf::from(".spritegen-frames")
}

fn default_frame_limit() -> i32 {
    DEFAULT_FRAME_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_metadata_fps() -> u32 {
    12
}

fn default_godot_resource_dir() -> String {
    "res://spritesheets".to_string()
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            directions: default_directions(),
            frame_step: default_frame_step(),
            rows_per_direction: default_rows_per_direction(),
            rotation_target: RotationTarget::default(),
            camera: None,
            output_dir: default_output_dir(),
            temp_subdir: default_temp_subdir(),
            frame_limit: default_frame_limit(),
            use_clip_range: true,
            metadata_fps: default_metadata_fps(),
            godot_export: true,
            godot_resource_dir: default_godot_resource_dir(),
            render_retries: 0,
        }
    }
}

impl BatchSettings {
    /// Parses settings from a JSON string.
    pub fn from_json(json: &str) -> PlanResult<Self> {
        serde_json::from_str(json).map_err(PlanError::Json)
    }

    /// Reads and parses settings from a JSON file.
    pub fn from_json_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> PlanResult<String> {
        serde_json::to_string_pretty(self).map_err(PlanError::Json)
    }

    /// Sets the direction count.
    pub fn with_directions(mut self, directions: u32) -> Self {
        self.directions = directions;
        self
    }

    /// Sets the frame step.
    pub fn with_frame_step(mut self, frame_step: u32) -> Self {
        self.frame_step = frame_step;
        self
    }

    /// Sets the rows per direction.
    pub fn with_rows_per_direction(mut self, rows: u32) -> Self {
        self.rows_per_direction = rows;
        self
    }

    /// Sets the rotation target.
    pub fn with_rotation_target(mut self, target: RotationTarget) -> Self {
        self.rotation_target = target;
        self
    }

    /// Sets the default camera.
    pub fn with_camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the frame limit used by range validation. Values outside
    /// `1..=DEFAULT_FRAME_LIMIT` fail [`BatchSettings::validate`].
    pub fn with_frame_limit(mut self, limit: i32) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Chooses keyframe ranges (true) or strip ranges (false) as defaults.
    pub fn with_use_clip_range(mut self, use_clip_range: bool) -> Self {
        self.use_clip_range = use_clip_range;
        self
    }

    /// Enables or disables the Godot resource export.
    pub fn with_godot_export(mut self, enabled: bool) -> Self {
        self.godot_export = enabled;
        self
    }

    /// Sets the number of retries for transient render errors.
    pub fn with_render_retries(mut self, retries: u32) -> Self {
        self.render_retries = retries;
        self
    }

    /// Returns the direction spec for these settings.
    ///
    /// Call [`BatchSettings::validate`] first; a zero direction count is
    /// reported there.
    pub fn direction_spec(&self) -> PlanResult<DirectionSpec> {
        DirectionSpec::new(self.directions)
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> PlanResult<()> {
        if self.directions == 0 || self.directions > MAX_DIRECTIONS {
            return Err(PlanError::invalid_settings(
                "directions",
                format!("must be in 1..={}, got {}", MAX_DIRECTIONS, self.directions),
            ));
        }
        if self.frame_step == 0 {
            return Err(PlanError::invalid_settings(
                "frame_step",
                "must be at least 1",
            ));
        }
        if self.rows_per_direction == 0 {
            return Err(PlanError::invalid_settings(
                "rows_per_direction",
                "must be at least 1",
            ));
        }
        if self.frame_limit <= 0 || self.frame_limit > DEFAULT_FRAME_LIMIT {
            return Err(PlanError::invalid_settings(
                "frame_limit",
                format!(
                    "must be in 1..={}, got {}",
                    DEFAULT_FRAME_LIMIT, self.frame_limit
                ),
            ));
        }
        if self.metadata_fps == 0 {
            return Err(PlanError::invalid_settings(
                "metadata_fps",
                "must be at least 1",
            ));
        }
        if self.output_dir == self.temp_subdir {
            return Err(PlanError::invalid_settings(
                "temp_subdir",
                "must differ from output_dir",
            ));
        }
        Ok(())
    }
}

/// Brings a frame limit into `1..=DEFAULT_FRAME_LIMIT`.
pub(crate) fn clamp_frame_limit(limit: i32) -> i32 {
    limit.clamp(1, DEFAULT_FRAME_LIMIT)
}
