//! spritegen Batch Planning
//!
//! This crate holds everything that happens before a batch renders: finding
//! rigs and their animation clips, the editable plan built from them, and
//! the workload estimate shown while the plan is edited.
//!
//! # Overview
//!
//! - **Discovery** reads rigs and clips from the host scene through
//!   [`AnimationSource`] and derives each clip's natural frame range.
//! - **Plan Model** ([`PlanModel`]) holds rig → clip → {enabled, start, end}
//!   selections with validating setters.
//! - **Estimator** ([`estimate`]) turns a plan into frame, sheet, and time
//!   totals.
//!
//! # Example
//!
//! ```
//! use spritegen_plan::{
//!     discover, estimate, BatchSettings, ClipData, PlanModel, RenderHistory,
//!     SceneDescription, SceneObject,
//! };
//!
//! let mut scene = SceneDescription::default();
//! scene.add_clip(ClipData::keyed("walk", vec![0.0, 7.0]));
//! scene.add_to_group("characters", SceneObject::armature("knight").with_active_clip("walk"));
//!
//! let settings = BatchSettings::default().with_directions(4).with_frame_step(2);
//! let discovery = discover(&scene, "characters");
//! let mut plan = PlanModel::from_discovery(&discovery, &settings);
//! plan.select_all();
//!
//! let directions = settings.direction_spec().unwrap();
//! let workload = estimate(&plan, &directions, settings.frame_step, &RenderHistory::default());
//! assert_eq!(workload.total_frames, 16);
//! assert_eq!(workload.total_sheets, 1);
//! ```
//!
//! # Modules
//!
//! - [`discovery`]: Scene access trait and clip discovery
//! - [`plan`]: Plan model and its edit operations
//! - [`estimate`]: Workload estimation and render history
//! - [`settings`]: Batch settings
//! - [`direction`]: View directions
//! - [`frames`]: Frame sampling
//! - [`grid`]: Sheet grid geometry
//! - [`error`]: Error types

pub mod direction;
pub mod discovery;
pub mod error;
pub mod estimate;
pub mod frames;
pub mod grid;
pub mod plan;
pub mod settings;

// Re-export commonly used types at the crate root
pub use direction::DirectionSpec;
pub use discovery::{
    discover, discover_with_limit, AnimationData, AnimationLayer, AnimationSource, ChannelData, ClipData,
    DiscoveredRig, Discovery, LayerStrip, ObjectKind, SceneDescription, SceneObject,
};
pub use error::{BackendError, PlanError, PlanResult};
pub use estimate::{
    estimate, max_sheet_grid, max_sheet_size, RenderHistory, RenderSample, TimeEstimate,
    WorkloadEstimate,
};
pub use frames::FrameRange;
pub use grid::SheetGrid;
pub use plan::{ClipPlan, ClipRange, PlanModel, RigPlan};
pub use settings::{BatchSettings, RotationTarget, DEFAULT_FRAME_LIMIT, MAX_DIRECTIONS};
