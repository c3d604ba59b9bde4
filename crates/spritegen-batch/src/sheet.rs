//! Sheet assembly.
//!
//! A sheet packs every frame of one (rig, clip) pair into a [`SheetGrid`]:
//! one band of rows per direction, frames left to right. Cells are exactly
//! frame-sized with no padding, and unused cells stay transparent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spritegen_plan::SheetGrid;
use tracing::debug;

use crate::error::{BatchError, BatchResult};
use crate::image::FrameImage;
use crate::storage::file_safe;

/// Pixel rectangle of one frame within a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// An assembled sheet, ready to persist.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub rig: String,
    pub clip: String,
    pub grid: SheetGrid,
    pub frame_width: u32,
    pub frame_height: u32,
    pub image: FrameImage,
}

impl SpriteSheet {
    /// `{rig}_{clip}.png`, with unsafe characters replaced.
    pub fn file_name(&self) -> String {
        sheet_file_name(&self.rig, &self.clip)
    }

    /// Rectangle of a frame by direction and frame index.
    pub fn frame_rect(&self, direction: u32, frame_index: u32) -> FrameRect {
        let (column, row) = self.grid.cell(direction, frame_index);
        FrameRect {
            x: column * self.frame_width,
            y: row * self.frame_height,
            width: self.frame_width,
            height: self.frame_height,
        }
    }
}

/// File name of the sheet for a pair.
pub fn sheet_file_name(rig: &str, clip: &str) -> String {
    format!("{}_{}.png", file_safe(rig), file_safe(clip))
}

/// Assembles a sheet from frames keyed by `(direction, frame index)`.
///
/// Every cell of `grid` must have a frame, and all frames must share the
/// size of the first one.
pub fn assemble_sheet(
    rig: &str,
    clip: &str,
    grid: SheetGrid,
    frames: &BTreeMap<(u32, u32), FrameImage>,
) -> BatchResult<SpriteSheet> {
    let missing = |direction: u32, frame_index: u32| BatchError::IncompleteFrameSet {
        rig: rig.to_string(),
        clip: clip.to_string(),
        direction,
        frame_index,
    };

    let first = frames.get(&(0, 0)).ok_or_else(|| missing(0, 0))?;
    let (frame_width, frame_height) = first.dimensions();
    let (width, height) = grid.pixel_size(frame_width, frame_height);
    let mut image = FrameImage::new(width, height);

    for direction in 0..grid.directions {
        for frame_index in 0..grid.frames_per_direction {
            let frame = frames
                .get(&(direction, frame_index))
                .ok_or_else(|| missing(direction, frame_index))?;
            if frame.dimensions() != (frame_width, frame_height) {
                return Err(BatchError::DimensionMismatch {
                    rig: rig.to_string(),
                    clip: clip.to_string(),
                    direction,
                    frame_index,
                    expected: (frame_width, frame_height),
                    actual: frame.dimensions(),
                });
            }
            let (column, row) = grid.cell(direction, frame_index);
            image.blit(frame, column * frame_width, row * frame_height);
        }
    }

    debug!(
        rig,
        clip,
        columns = grid.columns,
        rows = grid.rows,
        width,
        height,
        "assembled sheet"
    );

    Ok(SpriteSheet {
        rig: rig.to_string(),
        clip: clip.to_string(),
        grid,
        frame_width,
        frame_height,
        image,
    })
}
