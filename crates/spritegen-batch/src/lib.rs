//! spritegen Batch Execution
//!
//! This crate turns a [`PlanModel`](spritegen_plan::PlanModel) into
//! spritesheets. The host renderer and the output location are abstracted
//! behind two traits, so the same executor drives a 3D editor, a headless
//! renderer, or a test fake.
//!
//! # Overview
//!
//! - [`BatchExecutor`] is a cooperative state machine: one rendered frame
//!   per [`tick`](BatchExecutor::tick), cancellable at tick boundaries.
//! - [`RenderService`] positions the scene and renders frames.
//! - [`Storage`] persists temp frames, sheets, and metadata;
//!   [`FsStorage`] writes PNG files under a root directory.
//! - [`assemble_sheet`] packs a pair's frames into one image.
//! - [`emit_animations`] and [`sprite_frames_tres`] describe the sheets for
//!   game engines.
//!
//! # Example
//!
//! ```no_run
//! use spritegen_batch::{BatchExecutor, BatchState, FsStorage, RenderService};
//! use spritegen_plan::{BatchSettings, PlanModel};
//!
//! fn bake<R: RenderService>(renderer: R, plan: &PlanModel) -> spritegen_batch::BatchResult<()> {
//!     let storage = FsStorage::new("build");
//!     let mut executor = BatchExecutor::new(renderer, storage, BatchSettings::default())?;
//!     executor.start(plan)?;
//!     while executor.tick()? == BatchState::Running {
//!         // Let the host process events here.
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`executor`]: State machine, cancellation, run summary
//! - [`service`]: Render service trait and scene snapshots
//! - [`storage`]: Storage trait with filesystem and in-memory backends
//! - [`sheet`]: Sheet assembly
//! - [`metadata`]: Animation metadata
//! - [`godot`]: Godot `SpriteFrames` export
//! - [`progress`]: Progress observer
//! - [`png`]: Deterministic PNG encoding
//! - [`image`]: RGBA frame buffer
//! - [`error`]: Error types

pub mod error;
pub mod executor;
pub mod godot;
pub mod image;
pub mod metadata;
pub mod png;
pub mod progress;
pub mod service;
pub mod sheet;
pub mod storage;

// Re-export commonly used types at the crate root
pub use error::{BatchError, BatchResult};
pub use executor::{BatchExecutor, BatchState, BatchSummary, CancelHandle, SheetRecord};
pub use godot::sprite_frames_tres;
pub use image::FrameImage;
pub use metadata::{emit_animations, AnimationMetadata, ClipPlayback, NamedAnimation};
pub use png::{PngConfig, PngError};
pub use progress::{NoopObserver, Progress, ProgressObserver};
pub use service::{RenderErrorKind, RenderService, RenderServiceError, SceneState};
pub use sheet::{assemble_sheet, sheet_file_name, FrameRect, SpriteSheet};
pub use storage::{file_safe, FsStorage, MemoryStorage, Storage};
