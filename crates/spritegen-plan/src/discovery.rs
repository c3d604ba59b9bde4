//! Discovery of rigs and their animation clips.
//!
//! Discovery is a pure read of the host scene through [`AnimationSource`].
//! Problems with individual clips are collected in the result instead of
//! aborting, so one broken clip never hides the rest of a rig.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PlanError, PlanResult};
use crate::plan::{validate_range, ClipRange};
use crate::settings::{clamp_frame_limit, DEFAULT_FRAME_LIMIT};

/// Kind of a scene object. Only armatures are rigs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Object driven by a skeleton.
    Armature,
    /// Mesh-only object.
    Mesh,
    /// Camera object.
    Camera,
    /// Anything else (empties, lights, ...).
    #[default]
    Other,
}

/// A strip on an animation layer referencing a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerStrip {
    /// Clip referenced by the strip, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<String>,
    /// First frame the strip occupies on the timeline.
    pub frame_start: f64,
    /// Last frame the strip occupies on the timeline.
    pub frame_end: f64,
}

/// A stack of strips. Muted layers do not contribute clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AnimationLayer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub strips: Vec<LayerStrip>,
}

/// Animation bindings of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AnimationData {
    /// Clip currently bound to the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_clip: Option<String>,
    /// Layer stack, bottom first.
    #[serde(default)]
    pub layers: Vec<AnimationLayer>,
}

/// An object as seen by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneObject {
    pub id: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationData>,
}

impl SceneObject {
    /// Creates an armature object without animation data.
    pub fn armature(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ObjectKind::Armature,
            animation: None,
        }
    }

    /// Creates a mesh object.
    pub fn mesh(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ObjectKind::Mesh,
            animation: None,
        }
    }

    /// Binds the given clip as the active one.
    pub fn with_active_clip(mut self, clip: impl Into<String>) -> Self {
        self.animation
            .get_or_insert_with(AnimationData::default)
            .active_clip = Some(clip.into());
        self
    }

    /// Appends an animation layer.
    pub fn with_layer(mut self, layer: AnimationLayer) -> Self {
        self.animation
            .get_or_insert_with(AnimationData::default)
            .layers
            .push(layer);
        self
    }

    /// Returns true if this object is a rig.
    pub fn is_rig(&self) -> bool {
        self.kind == ObjectKind::Armature
    }
}

/// Read access to the host scene's objects and clip keyframes.
pub trait AnimationSource {
    /// Objects that are direct members of the group. Children of those
    /// objects are not included.
    fn group_objects(&self, group: &str) -> Vec<SceneObject>;

    /// Keyframe times across every animated channel of a clip, or `None`
    /// when the clip does not exist.
    fn clip_keyframes(&self, clip: &str) -> Option<Vec<f64>>;
}

/// One animated channel of a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelData {
    /// Animated property path (e.g. `pose.bones["hand.L"].rotation`).
    #[serde(default)]
    pub path: String,
    /// Keyframe times in frames.
    #[serde(default)]
    pub keyframes: Vec<f64>,
}

/// A named clip with its channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipData {
    pub id: String,
    #[serde(default)]
    pub channels: Vec<ChannelData>,
}

impl ClipData {
    /// Creates a clip with a single channel keyed at the given times.
    pub fn keyed(id: impl Into<String>, keyframes: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            channels: vec![ChannelData {
                path: String::new(),
                keyframes,
            }],
        }
    }
}

/// A serializable, in-memory scene.
///
/// Useful for fixtures and for hosts that export their scene as JSON
/// instead of answering queries live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SceneDescription {
    /// Group name to member object ids.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub clips: Vec<ClipData>,
}

impl SceneDescription {
    /// Parses a scene from JSON.
    pub fn from_json(json: &str) -> PlanResult<Self> {
        serde_json::from_str(json).map_err(PlanError::Json)
    }

    /// Adds an object and makes it a member of `group`.
    pub fn add_to_group(&mut self, group: &str, object: SceneObject) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(object.id.clone());
        self.objects.push(object);
    }

    /// Adds a clip.
    pub fn add_clip(&mut self, clip: ClipData) {
        self.clips.push(clip);
    }
}

impl AnimationSource for SceneDescription {
    fn group_objects(&self, group: &str) -> Vec<SceneObject> {
        let Some(members) = self.groups.get(group) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| self.objects.iter().find(|o| &o.id == id))
            .cloned()
            .collect()
    }

    fn clip_keyframes(&self, clip: &str) -> Option<Vec<f64>> {
        self.clips.iter().find(|c| c.id == clip).map(|c| {
            c.channels
                .iter()
                .flat_map(|ch| ch.keyframes.iter().copied())
                .collect()
        })
    }
}

/// A rig and the clips discovered for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredRig {
    pub id: String,
    pub clips: Vec<ClipRange>,
}

/// Result of discovery: rigs in group order plus per-clip problems.
#[derive(Debug, Default)]
pub struct Discovery {
    pub rigs: Vec<DiscoveredRig>,
    pub errors: Vec<PlanError>,
}

impl Discovery {
    /// Returns true if every clip was read without problems.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Looks up a discovered rig.
    pub fn rig(&self, id: &str) -> Option<&DiscoveredRig> {
        self.rigs.iter().find(|r| r.id == id)
    }
}

/// Discovers the rigs in `group` and their clips.
///
/// Clips are collected from the bound clip first, then from strips on
/// non-muted layers in stack order, de-duplicated by id. Non-rig objects are
/// skipped. Rigs listed twice in a group are reported once.
pub fn discover<S: AnimationSource + ?Sized>(source: &S, group: &str) -> Discovery {
    discover_with_limit(source, group, DEFAULT_FRAME_LIMIT)
}

/// Like [`discover`], with ranges checked against `frame_limit`.
///
/// A clip whose keyframes fall outside `[-frame_limit, frame_limit]` is
/// reported as [`PlanError::InvalidRange`] and left out. An out-of-limit
/// strip range is reported and dropped; the clip itself is kept.
pub fn discover_with_limit<S: AnimationSource + ?Sized>(
    source: &S,
    group: &str,
    frame_limit: i32,
) -> Discovery {
    let limit = clamp_frame_limit(frame_limit);
    let mut discovery = Discovery::default();

    for object in source.group_objects(group) {
        if !object.is_rig() {
            continue;
        }
        if discovery.rig(&object.id).is_some() {
            continue;
        }

        let mut clips = Vec::new();
        for clip_id in clip_ids_for(&object) {
            let range = natural_range(source, &object.id, &clip_id).and_then(|(start, end)| {
                validate_range(limit, &object.id, &clip_id, start, end)?;
                Ok((start, end))
            });
            match range {
                Ok((start, end)) => {
                    let strip_range = strip_range_for(&object, &clip_id).filter(|&(s, e)| {
                        match validate_range(limit, &object.id, &clip_id, s, e) {
                            Ok(()) => true,
                            Err(err) => {
                                warn!(rig = %object.id, clip = %clip_id, "strip range dropped: {}", err);
                                discovery.errors.push(err);
                                false
                            }
                        }
                    });
                    clips.push(ClipRange {
                        clip: clip_id.clone(),
                        start,
                        end,
                        strip_range,
                    });
                }
                Err(err) => {
                    warn!(rig = %object.id, clip = %clip_id, "{}", err);
                    discovery.errors.push(err);
                }
            }
        }

        discovery.rigs.push(DiscoveredRig {
            id: object.id.clone(),
            clips,
        });
    }

    discovery
}

/// Clip ids reachable from an object, in discovery order.
fn clip_ids_for(object: &SceneObject) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let Some(animation) = &object.animation else {
        return ids;
    };

    if let Some(active) = &animation.active_clip {
        ids.push(active.clone());
    }

    for layer in animation.layers.iter().filter(|l| !l.muted) {
        for strip in &layer.strips {
            if let Some(clip) = &strip.clip {
                if !ids.contains(clip) {
                    ids.push(clip.clone());
                }
            }
        }
    }

    ids
}

/// `[floor(min keyframe), ceil(max keyframe)]` over all channels of a clip.
/// Bounds beyond `i32` saturate and fail the limit check afterwards.
fn natural_range<S: AnimationSource + ?Sized>(
    source: &S,
    rig: &str,
    clip: &str,
) -> PlanResult<(i32, i32)> {
    let keyframes = source
        .clip_keyframes(clip)
        .ok_or_else(|| PlanError::unknown_clip(rig, clip))?;

    let mut bounds: Option<(f64, f64)> = None;
    for t in keyframes.into_iter().filter(|t| t.is_finite()) {
        bounds = Some(match bounds {
            None => (t, t),
            Some((lo, hi)) => (lo.min(t), hi.max(t)),
        });
    }

    let (lo, hi) = bounds.ok_or_else(|| PlanError::EmptyClip {
        rig: rig.to_string(),
        clip: clip.to_string(),
    })?;

    Ok((lo.floor() as i32, hi.ceil() as i32))
}

/// Timeline range of the first unmuted strip on the object playing `clip`.
fn strip_range_for(object: &SceneObject, clip: &str) -> Option<(i32, i32)> {
    let animation = object.animation.as_ref()?;
    animation
        .layers
        .iter()
        .filter(|l| !l.muted)
        .flat_map(|l| l.strips.iter())
        .find(|s| s.clip.as_deref() == Some(clip))
        .map(|s| (s.frame_start.floor() as i32, s.frame_end.ceil() as i32))
}
