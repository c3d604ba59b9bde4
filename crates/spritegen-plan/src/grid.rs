//! Spritesheet grid geometry.
//!
//! Frames are placed row-major: direction 0's frames fill the first
//! `rows_per_direction` rows left to right, top to bottom, then direction 1,
//! and so on. Animation metadata relies on this order.

use serde::{Deserialize, Serialize};

/// Grid geometry of one sheet, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetGrid {
    /// Number of directions stacked vertically.
    pub directions: u32,
    /// Frames rendered per direction.
    pub frames_per_direction: u32,
    /// Rows each direction wraps across.
    pub rows_per_direction: u32,
    /// Cells per row.
    pub columns: u32,
    /// Total rows.
    pub rows: u32,
}

impl SheetGrid {
    /// Computes the grid for a sheet. Zero arguments are treated as 1.
    pub fn new(directions: u32, frames_per_direction: u32, rows_per_direction: u32) -> Self {
        let directions = directions.max(1);
        let frames_per_direction = frames_per_direction.max(1);
        let rows_per_direction = rows_per_direction.max(1);
        Self {
            directions,
            frames_per_direction,
            rows_per_direction,
            columns: frames_per_direction.div_ceil(rows_per_direction),
            rows: directions * rows_per_direction,
        }
    }

    /// Cell `(column, row)` of a frame.
    pub fn cell(&self, direction: u32, frame_index: u32) -> (u32, u32) {
        let column = frame_index % self.columns;
        let row = direction * self.rows_per_direction + frame_index / self.columns;
        (column, row)
    }

    /// Sheet size in pixels for the given frame size.
    pub fn pixel_size(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        (self.columns * frame_width, self.rows * frame_height)
    }

    /// Total number of cells holding a frame.
    pub fn frame_count(&self) -> u32 {
        self.directions * self.frames_per_direction
    }
}
