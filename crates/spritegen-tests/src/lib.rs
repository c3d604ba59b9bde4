//! spritegen End-to-End Test Infrastructure
//!
//! This crate drives the full pipeline against a scripted renderer:
//!
//! - Discovery and planning over an in-memory scene
//! - Batch execution into a temporary output directory
//! - Inspection of the written sheets and metadata
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p spritegen-tests
//! ```

pub mod fixtures;
pub mod png_check;
pub mod render;

// Re-export commonly used items
pub use fixtures::{demo_scene, reference_plan, OutputFixture, GROUP};
pub use png_check::{decode_png, DecodedPng};
pub use render::{FakeRenderService, RenderCall};
