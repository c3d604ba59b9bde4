//! Animation metadata emitted next to each rig's sheets.
//!
//! One named animation per (clip, direction), holding the frame rectangles
//! in playback order. The derivation is pure: the same sheet and playback
//! flags always give the same animations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use spritegen_plan::DirectionSpec;

use crate::error::{BatchError, BatchResult};
use crate::sheet::{FrameRect, SpriteSheet};

/// Playback flags for one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipPlayback {
    pub reverse: bool,
    pub looping: bool,
    pub fps: u32,
}

/// A named animation within a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAnimation {
    /// `{clip}_{direction label}`.
    pub name: String,
    pub clip: String,
    pub direction: u32,
    pub direction_label: String,
    /// Sheet file name the rectangles refer to.
    pub sheet: String,
    /// Frame rectangles in playback order.
    pub frames: Vec<FrameRect>,
    pub frame_count: u32,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub fps: u32,
}

/// All animations of one rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationMetadata {
    pub rig: String,
    pub animations: Vec<NamedAnimation>,
}

impl AnimationMetadata {
    pub fn new(rig: impl Into<String>) -> Self {
        Self {
            rig: rig.into(),
            animations: Vec::new(),
        }
    }

    /// Looks up an animation by name.
    pub fn animation(&self, name: &str) -> Option<&NamedAnimation> {
        self.animations.iter().find(|a| a.name == name)
    }

    /// Distinct sheet file names, sorted.
    pub fn sheets(&self) -> Vec<&str> {
        self.animations
            .iter()
            .map(|a| a.sheet.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn to_json_pretty(&self) -> BatchResult<String> {
        serde_json::to_string_pretty(self).map_err(BatchError::SerializeFailed)
    }

    pub fn from_json(json: &str) -> BatchResult<Self> {
        serde_json::from_str(json).map_err(BatchError::SerializeFailed)
    }
}

/// Derives one animation per direction of a sheet.
pub fn emit_animations(
    sheet: &SpriteSheet,
    directions: &DirectionSpec,
    playback: &ClipPlayback,
) -> Vec<NamedAnimation> {
    let sheet_name = sheet.file_name();
    let frame_count = sheet.grid.frames_per_direction;

    directions
        .indices()
        .map(|direction| {
            let label = directions.label(direction);
            let mut frames: Vec<FrameRect> = (0..frame_count)
                .map(|index| sheet.frame_rect(direction, index))
                .collect();
            if playback.reverse {
                frames.reverse();
            }
            NamedAnimation {
                name: format!("{}_{}", sheet.clip, label),
                clip: sheet.clip.clone(),
                direction,
                direction_label: label,
                sheet: sheet_name.clone(),
                frames,
                frame_count,
                looping: playback.looping,
                fps: playback.fps,
            }
        })
        .collect()
}
