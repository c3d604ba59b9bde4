//! View directions sampled around a rig.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

const COMPASS_4: [&str; 4] = ["s", "e", "n", "w"];
const COMPASS_8: [&str; 8] = ["s", "se", "e", "ne", "n", "nw", "w", "sw"];

/// Evenly spaced rotations, `360 / count` degrees apart, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSpec {
    count: u32,
}

impl DirectionSpec {
    /// Creates a direction spec. The count must be at least 1.
    pub fn new(count: u32) -> PlanResult<Self> {
        if count == 0 {
            return Err(PlanError::invalid_settings(
                "directions",
                "must be at least 1",
            ));
        }
        Ok(Self { count })
    }

    /// Number of directions.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Degrees between consecutive directions.
    pub fn step_degrees(&self) -> f64 {
        360.0 / self.count as f64
    }

    /// Rotation in degrees for a direction index.
    pub fn angle(&self, index: u32) -> f64 {
        index as f64 * self.step_degrees()
    }

    /// Short name for a direction, used in animation names.
    ///
    /// Four and eight directions get compass names (index 0 faces the
    /// camera, "s"); other counts use `dir00`, `dir01`, ...
    pub fn label(&self, index: u32) -> String {
        match self.count {
            1 => "default".to_string(),
            4 => COMPASS_4[(index % 4) as usize].to_string(),
            8 => COMPASS_8[(index % 8) as usize].to_string(),
            _ => format!("dir{:02}", index),
        }
    }

    /// Iterates over direction indices in render order.
    pub fn indices(&self) -> std::ops::Range<u32> {
        0..self.count
    }
}
