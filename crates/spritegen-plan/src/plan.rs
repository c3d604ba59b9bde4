//! The editable batch plan: rigs, their clips, and per-clip overrides.
//!
//! All fields that carry an invariant are private and changed only through
//! validating setters on [`PlanModel`]. A rejected edit leaves the plan
//! exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::discovery::{DiscoveredRig, Discovery};
use crate::error::{PlanError, PlanResult};
use crate::frames::FrameRange;
use crate::settings::{clamp_frame_limit, BatchSettings, DEFAULT_FRAME_LIMIT};

/// Natural frame range of a clip, as read from its keyframes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRange {
    /// Clip identifier.
    pub clip: String,
    /// First keyed frame.
    pub start: i32,
    /// Last keyed frame.
    pub end: i32,
    /// Timeline range of the layer strip playing this clip on the rig, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_range: Option<(i32, i32)>,
}

impl ClipRange {
    /// Creates a clip range without a strip range.
    pub fn new(clip: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            clip: clip.into(),
            start,
            end,
            strip_range: None,
        }
    }

    /// Sets the strip range.
    pub fn with_strip_range(mut self, start: i32, end: i32) -> Self {
        self.strip_range = Some((start, end));
        self
    }

    /// Bounds a new clip plan starts with.
    ///
    /// Keyframe bounds are used unless `use_clip_range` is false and a
    /// well-formed strip range exists.
    pub fn default_bounds(&self, use_clip_range: bool) -> (i32, i32) {
        match self.strip_range {
            Some((start, end)) if !use_clip_range && start <= end => (start, end),
            _ => (self.start, self.end),
        }
    }
}

/// Per-clip plan entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipPlan {
    range: ClipRange,
    enabled: bool,
    start: i32,
    end: i32,
    reverse: bool,
    looping: bool,
}

impl ClipPlan {
    /// Creates an enabled clip plan covering the natural range.
    pub fn new(range: ClipRange) -> Self {
        let (start, end) = (range.start.min(range.end), range.start.max(range.end));
        Self {
            range,
            enabled: true,
            start,
            end,
            reverse: false,
            looping: true,
        }
    }

    fn with_defaults(range: ClipRange, settings: &BatchSettings) -> Self {
        let mut plan = Self::new(range);
        let (start, end) = plan.range.default_bounds(settings.use_clip_range);
        if start <= end {
            plan.start = start;
            plan.end = end;
        }
        plan
    }

    /// Pulls both bounds into `[-limit, limit]`. Order is preserved.
    fn clamp_bounds(&mut self, limit: i32) {
        self.start = self.start.clamp(-limit, limit);
        self.end = self.end.clamp(-limit, limit);
    }

    /// Clip identifier.
    pub fn clip(&self) -> &str {
        &self.range.clip
    }

    /// The natural range this plan was created from.
    pub fn range(&self) -> &ClipRange {
        &self.range
    }

    /// Whether this clip is selected for rendering.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Effective first frame.
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Effective last frame.
    pub fn end(&self) -> i32 {
        self.end
    }

    /// Play the clip backwards in exported animations. Rendering is unaffected.
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Whether exported animations loop.
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Effective range sampled with `step`.
    pub fn frame_range(&self, step: u32) -> FrameRange {
        FrameRange::new(self.start, self.end, step)
    }
}

/// Per-rig plan entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigPlan {
    id: String,
    enabled: bool,
    expanded: bool,
    clips: Vec<ClipPlan>,
    camera: Option<String>,
    emit_metadata: bool,
}

impl RigPlan {
    /// Creates an enabled, expanded rig plan with no clips.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            expanded: true,
            clips: Vec::new(),
            camera: None,
            emit_metadata: true,
        }
    }

    /// Appends an enabled clip covering its natural range. A clip id that is
    /// already present is ignored.
    pub fn with_clip(mut self, range: ClipRange) -> Self {
        if self.clip(&range.clip).is_none() {
            self.clips.push(ClipPlan::new(range));
        }
        self
    }

    /// Sets the rig's camera.
    pub fn with_camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Sets whether animation metadata is written for this rig.
    pub fn with_emit_metadata(mut self, emit: bool) -> Self {
        self.emit_metadata = emit;
        self
    }

    /// Rig identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this rig is selected for rendering.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Presentation-only expansion state.
    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// All clips, enabled or not.
    pub fn clips(&self) -> &[ClipPlan] {
        &self.clips
    }

    /// Looks up a clip.
    pub fn clip(&self, clip: &str) -> Option<&ClipPlan> {
        self.clips.iter().find(|c| c.clip() == clip)
    }

    /// Camera override for this rig.
    pub fn camera(&self) -> Option<&str> {
        self.camera.as_deref()
    }

    /// Whether animation metadata is written for this rig.
    pub fn emit_metadata(&self) -> bool {
        self.emit_metadata
    }

    /// Clips that will actually render. Empty when the rig is disabled,
    /// whatever the clips' own flags say.
    pub fn active_clips(&self) -> impl Iterator<Item = &ClipPlan> {
        let rig_enabled = self.enabled;
        self.clips.iter().filter(move |c| rig_enabled && c.enabled)
    }

    /// Enabled clip count over total, as shown next to the rig name.
    pub fn enabled_summary(&self) -> (usize, usize) {
        (
            self.clips.iter().filter(|c| c.enabled).count(),
            self.clips.len(),
        )
    }

    fn clip_mut(&mut self, clip: &str) -> PlanResult<&mut ClipPlan> {
        let rig = self.id.clone();
        self.clips
            .iter_mut()
            .find(|c| c.clip() == clip)
            .ok_or_else(|| PlanError::unknown_clip(rig, clip))
    }

    fn sync_clips(&mut self, discovered: &DiscoveredRig, settings: &BatchSettings, limit: i32) {
        let mut previous = std::mem::take(&mut self.clips);
        for range in &discovered.clips {
            if let Err(err) = validate_range(limit, &self.id, &range.clip, range.start, range.end) {
                warn!(rig = %self.id, clip = %range.clip, "skipping clip: {}", err);
                continue;
            }
            match previous.iter().position(|c| c.clip() == range.clip) {
                Some(index) => {
                    let mut kept = previous.swap_remove(index);
                    kept.range = range.clone();
                    kept.clamp_bounds(limit);
                    self.clips.push(kept);
                }
                None => {
                    let mut fresh = ClipPlan::with_defaults(range.clone(), settings);
                    fresh.enabled = false;
                    fresh.clamp_bounds(limit);
                    self.clips.push(fresh);
                }
            }
        }
        if !previous.is_empty() {
            debug!(rig = %self.id, removed = previous.len(), "dropped clips no longer on rig");
        }
    }
}

/// Ordered rig plans; each rig id appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanModel {
    rigs: Vec<RigPlan>,
    frame_limit: i32,
}

impl Default for PlanModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanModel {
    /// Creates an empty plan with the default frame limit.
    pub fn new() -> Self {
        Self {
            rigs: Vec::new(),
            frame_limit: DEFAULT_FRAME_LIMIT,
        }
    }

    /// Sets the frame limit used by range validation, capped to
    /// `1..=DEFAULT_FRAME_LIMIT`. Existing clip bounds are pulled inside it.
    pub fn with_frame_limit(mut self, limit: i32) -> Self {
        self.frame_limit = clamp_frame_limit(limit);
        let limit = self.frame_limit;
        for clip in self.rigs.iter_mut().flat_map(|r| r.clips.iter_mut()) {
            clip.clamp_bounds(limit);
        }
        self
    }

    /// Builds a plan from discovery output.
    ///
    /// Rigs start enabled and expanded; clips start disabled with their
    /// default bounds.
    pub fn from_discovery(discovery: &Discovery, settings: &BatchSettings) -> Self {
        let mut plan = Self::new();
        plan.sync(discovery, settings);
        plan
    }

    /// Brings the plan in line with fresh discovery output.
    ///
    /// Rigs and clips that are still present keep every user edit; new ones
    /// are added with defaults; vanished ones are removed. Order follows the
    /// discovery. Clips whose natural range breaks the frame limit are
    /// skipped, and kept bounds are pulled inside it.
    pub fn sync(&mut self, discovery: &Discovery, settings: &BatchSettings) {
        self.frame_limit = clamp_frame_limit(settings.frame_limit);
        let limit = self.frame_limit;
        let mut previous = std::mem::take(&mut self.rigs);

        for discovered in &discovery.rigs {
            if self.rig(&discovered.id).is_some() {
                continue;
            }
            let mut rig = match previous.iter().position(|r| r.id == discovered.id) {
                Some(index) => previous.swap_remove(index),
                None => RigPlan::new(discovered.id.clone()),
            };
            rig.sync_clips(discovered, settings, limit);
            self.rigs.push(rig);
        }

        debug!(
            rigs = self.rigs.len(),
            removed = previous.len(),
            "plan synced with scene"
        );
    }

    /// Appends a rig plan. Every clip must sit inside the frame limit.
    pub fn push_rig(&mut self, rig: RigPlan) -> PlanResult<()> {
        if self.rig(&rig.id).is_some() {
            return Err(PlanError::DuplicateRig { rig: rig.id });
        }
        for clip in &rig.clips {
            validate_range(self.frame_limit, &rig.id, clip.clip(), clip.start, clip.end)?;
        }
        self.rigs.push(rig);
        Ok(())
    }

    /// Frame limit used by range validation.
    pub fn frame_limit(&self) -> i32 {
        self.frame_limit
    }

    /// All rigs in plan order.
    pub fn rigs(&self) -> &[RigPlan] {
        &self.rigs
    }

    /// Looks up a rig.
    pub fn rig(&self, rig: &str) -> Option<&RigPlan> {
        self.rigs.iter().find(|r| r.id == rig)
    }

    /// Returns true if the plan has no rigs.
    pub fn is_empty(&self) -> bool {
        self.rigs.is_empty()
    }

    /// Every (rig, clip) pair that will render, in plan order.
    pub fn active_pairs(&self) -> impl Iterator<Item = (&RigPlan, &ClipPlan)> {
        self.rigs
            .iter()
            .flat_map(|rig| rig.active_clips().map(move |clip| (rig, clip)))
    }

    /// Returns true if at least one (rig, clip) pair will render.
    pub fn has_active_pairs(&self) -> bool {
        self.active_pairs().next().is_some()
    }

    fn rig_mut(&mut self, rig: &str) -> PlanResult<&mut RigPlan> {
        self.rigs
            .iter_mut()
            .find(|r| r.id == rig)
            .ok_or_else(|| PlanError::unknown_rig(rig))
    }

    /// Enables or disables a rig. Its clips keep their own flags.
    pub fn set_rig_enabled(&mut self, rig: &str, enabled: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.enabled = enabled;
        Ok(())
    }

    /// Enables or disables one clip.
    pub fn set_clip_enabled(&mut self, rig: &str, clip: &str, enabled: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.clip_mut(clip)?.enabled = enabled;
        Ok(())
    }

    /// Enables or disables every clip of one rig.
    pub fn set_rig_clips_enabled(&mut self, rig: &str, enabled: bool) -> PlanResult<()> {
        for clip in &mut self.rig_mut(rig)?.clips {
            clip.enabled = enabled;
        }
        Ok(())
    }

    /// Sets both bounds of a clip.
    pub fn set_clip_range(&mut self, rig: &str, clip: &str, start: i32, end: i32) -> PlanResult<()> {
        validate_range(self.frame_limit, rig, clip, start, end)?;
        let target = self.rig_mut(rig)?.clip_mut(clip)?;
        target.start = start;
        target.end = end;
        Ok(())
    }

    /// Sets the first frame, keeping the current end.
    pub fn set_clip_start(&mut self, rig: &str, clip: &str, start: i32) -> PlanResult<()> {
        let end = self.clip_plan(rig, clip)?.end;
        self.set_clip_range(rig, clip, start, end)
    }

    /// Sets the last frame, keeping the current start.
    pub fn set_clip_end(&mut self, rig: &str, clip: &str, end: i32) -> PlanResult<()> {
        let start = self.clip_plan(rig, clip)?.start;
        self.set_clip_range(rig, clip, start, end)
    }

    /// Restores a clip's default bounds.
    pub fn reset_clip_range(&mut self, rig: &str, clip: &str, use_clip_range: bool) -> PlanResult<()> {
        let (start, end) = self
            .clip_plan(rig, clip)?
            .range
            .default_bounds(use_clip_range);
        self.set_clip_range(rig, clip, start, end)
    }

    /// Sets reverse playback for a clip's exported animations.
    pub fn set_clip_reverse(&mut self, rig: &str, clip: &str, reverse: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.clip_mut(clip)?.reverse = reverse;
        Ok(())
    }

    /// Sets whether a clip's exported animations loop.
    pub fn set_clip_looping(&mut self, rig: &str, clip: &str, looping: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.clip_mut(clip)?.looping = looping;
        Ok(())
    }

    /// Expands or collapses a rig in the planning view.
    pub fn set_rig_expanded(&mut self, rig: &str, expanded: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.expanded = expanded;
        Ok(())
    }

    /// Sets or clears a rig's camera override.
    pub fn set_rig_camera(&mut self, rig: &str, camera: Option<String>) -> PlanResult<()> {
        self.rig_mut(rig)?.camera = camera;
        Ok(())
    }

    /// Sets whether animation metadata is written for a rig.
    pub fn set_rig_emit_metadata(&mut self, rig: &str, emit: bool) -> PlanResult<()> {
        self.rig_mut(rig)?.emit_metadata = emit;
        Ok(())
    }

    /// Enables every rig and clip.
    pub fn select_all(&mut self) {
        self.set_all(true);
    }

    /// Disables every rig and clip.
    pub fn deselect_all(&mut self) {
        self.set_all(false);
    }

    fn set_all(&mut self, enabled: bool) {
        for rig in &mut self.rigs {
            rig.enabled = enabled;
            for clip in &mut rig.clips {
                clip.enabled = enabled;
            }
        }
    }

    fn clip_plan(&self, rig: &str, clip: &str) -> PlanResult<&ClipPlan> {
        self.rig(rig)
            .ok_or_else(|| PlanError::unknown_rig(rig))?
            .clip(clip)
            .ok_or_else(|| PlanError::unknown_clip(rig, clip))
    }
}

pub(crate) fn validate_range(limit: i32, rig: &str, clip: &str, start: i32, end: i32) -> PlanResult<()> {
    if start > end {
        return Err(PlanError::invalid_range(
            rig,
            clip,
            start,
            end,
            "start is after end",
        ));
    }
    if start < -limit || end > limit {
        return Err(PlanError::invalid_range(
            rig,
            clip,
            start,
            end,
            format!("frames must stay within -{}..={}", limit, limit),
        ));
    }
    Ok(())
}
