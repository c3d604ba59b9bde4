//! Scene, plan, and output-directory fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use spritegen_batch::FsStorage;
use spritegen_plan::{
    AnimationLayer, ClipData, ClipRange, LayerStrip, PlanModel, RigPlan, SceneDescription,
    SceneObject,
};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Group holding the demo rigs.
pub const GROUP: &str = "characters";

fn strip(clip: &str, start: f64, end: f64) -> LayerStrip {
    LayerStrip {
        clip: Some(clip.to_string()),
        frame_start: start,
        frame_end: end,
    }
}

/// A small scene exercising every discovery path.
///
/// - `knight`: bound to `walk` (keys 0..=7), plus `attack` on a layer strip
///   spanning frames 10..=20 and `tpose` on a muted layer.
/// - `archer`: bound to `idle` (keys 0..=7), plus `walk` on a layer.
/// - `lamp`: a mesh, not a rig.
/// - `ghost`: bound to a clip that does not exist, plus a clip without keys.
pub fn demo_scene() -> SceneDescription {
    let mut scene = SceneDescription::default();
    scene.add_clip(ClipData::keyed("idle", vec![0.0, 3.0, 7.0]));
    scene.add_clip(ClipData::keyed("walk", vec![0.0, 7.0]));
    scene.add_clip(ClipData::keyed("attack", vec![2.4, 9.6]));
    scene.add_clip(ClipData::keyed("tpose", vec![0.0]));
    scene.add_clip(ClipData::keyed("empty", Vec::new()));

    scene.add_to_group(
        GROUP,
        SceneObject::armature("knight")
            .with_active_clip("walk")
            .with_layer(AnimationLayer {
                name: "combat".to_string(),
                muted: false,
                strips: vec![strip("attack", 10.0, 20.0)],
            })
            .with_layer(AnimationLayer {
                name: "debug".to_string(),
                muted: true,
                strips: vec![strip("tpose", 0.0, 1.0)],
            }),
    );
    scene.add_to_group(
        GROUP,
        SceneObject::armature("archer")
            .with_active_clip("idle")
            .with_layer(AnimationLayer {
                name: "base".to_string(),
                muted: false,
                strips: vec![strip("walk", 0.0, 7.0)],
            }),
    );
    scene.add_to_group(GROUP, SceneObject::mesh("lamp"));
    scene.add_to_group(
        GROUP,
        SceneObject::armature("ghost")
            .with_active_clip("haunt")
            .with_layer(AnimationLayer {
                name: "base".to_string(),
                muted: false,
                strips: vec![strip("empty", 0.0, 4.0)],
            }),
    );
    scene
}

/// Two rigs with `idle` and `walk` over frames 0..=7, everything enabled.
pub fn reference_plan() -> PlanModel {
    let mut plan = PlanModel::new();
    for rig in ["knight", "archer"] {
        plan.push_rig(
            RigPlan::new(rig)
                .with_clip(ClipRange::new("idle", 0, 7))
                .with_clip(ClipRange::new("walk", 0, 7)),
        )
        .expect("fixture rigs are unique");
    }
    plan
}

/// A temporary output root.
pub struct OutputFixture {
    pub root: TempDir,
}

impl OutputFixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Filesystem storage rooted here.
    pub fn storage(&self) -> FsStorage {
        FsStorage::new(self.path())
    }

    /// Every file under the root, relative and sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(self.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(self.path()).ok().map(Path::to_path_buf))
            .collect();
        files.sort();
        files
    }

    /// Files under a relative directory.
    pub fn files_in(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        self.files()
            .into_iter()
            .filter(|f| f.starts_with(dir))
            .collect()
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.path().join(rel).exists()
    }

    pub fn read_text(&self, rel: impl AsRef<Path>) -> String {
        let path = self.path().join(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }
}

impl Default for OutputFixture {
    fn default() -> Self {
        Self::new()
    }
}
