//! Batch executor.
//!
//! [`BatchExecutor`] renders a frozen copy of a [`PlanModel`] one frame per
//! [`BatchExecutor::tick`], so a host UI can stay responsive between calls.
//!
//! ```text
//! Idle ──start──▶ Running ──last unit──▶ Completed
//!                    │ ──cancel──▶ Cancelled
//!                    └ ──error───▶ Failed
//! ```
//!
//! Each unit positions the scene at (pair, direction, frame), renders, and
//! stores the frame as a temporary image. When the last frame of a pair is
//! stored, the pair's sheet is assembled and persisted and its temporary
//! frames are deleted. Metadata for a rig is written with its last sheet.
//! Whatever the outcome, a finished run leaves no temporary frames behind
//! and the scene as it was before `start`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use spritegen_plan::{
    BatchSettings, DirectionSpec, PlanModel, RenderSample, RotationTarget, SheetGrid,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{BatchError, BatchResult};
use crate::godot::sprite_frames_tres;
use crate::image::FrameImage;
use crate::metadata::{emit_animations, AnimationMetadata, ClipPlayback};
use crate::progress::{NoopObserver, Progress, ProgressObserver};
use crate::service::{RenderService, RenderServiceError, SceneState};
use crate::sheet::{assemble_sheet, sheet_file_name};
use crate::storage::{file_safe, Storage};

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Idle => "idle",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Cancelled => "cancelled",
            BatchState::Failed => "failed",
        }
    }

    /// Returns true for states a run ends in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Cancelled | BatchState::Failed
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests cancellation of a running batch from anywhere.
///
/// The request is observed at the start of the next tick.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A sheet persisted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRecord {
    pub rig: String,
    pub clip: String,
    /// Storage path of the sheet.
    pub path: PathBuf,
    /// BLAKE3 hash of the encoded PNG.
    pub hash: String,
    pub width: u32,
    pub height: u32,
    pub grid: SheetGrid,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub state: BatchState,
    pub frames_rendered: u64,
    pub frames_total: u64,
    pub sheets: Vec<SheetRecord>,
    pub metadata_files: Vec<PathBuf>,
    pub elapsed_secs: f64,
    /// Temporary frames that could not be deleted.
    #[serde(default)]
    pub leftover_temps: Vec<PathBuf>,
}

impl BatchSummary {
    /// Sample for the workload estimator's render history.
    pub fn render_sample(&self) -> Option<RenderSample> {
        if self.frames_rendered == 0 {
            return None;
        }
        Some(RenderSample {
            frames: self.frames_rendered,
            elapsed_secs: self.elapsed_secs,
        })
    }
}

/// One (rig, clip) pair, frozen at `start`.
#[derive(Debug, Clone)]
struct PairJob {
    rig: String,
    clip: String,
    frames: Vec<i32>,
    rotate_object: String,
    playback: ClipPlayback,
    emit_metadata: bool,
    last_of_rig: bool,
}

/// Position of the next unit, plus the temp frames of the current pair.
#[derive(Debug, Default)]
struct Cursor {
    pair: usize,
    direction: u32,
    frame_index: usize,
    temps: BTreeMap<(u32, u32), PathBuf>,
}

/// Renders a plan one frame per tick.
pub struct BatchExecutor<R, S> {
    render: R,
    storage: S,
    settings: BatchSettings,
    directions: DirectionSpec,
    observer: Box<dyn ProgressObserver>,
    cancel: CancelHandle,
    state: BatchState,
    pairs: Vec<PairJob>,
    cursor: Cursor,
    snapshot: Option<SceneState>,
    rig_metadata: Option<AnimationMetadata>,
    sheets: Vec<SheetRecord>,
    metadata_files: Vec<PathBuf>,
    leftover_temps: Vec<PathBuf>,
    frames_done: u64,
    frames_total: u64,
    started: Option<Instant>,
    elapsed: Duration,
    last_frame_secs: f64,
}

impl<R: RenderService, S: Storage> BatchExecutor<R, S> {
    /// Creates an idle executor. Fails if the settings are invalid.
    pub fn new(render: R, storage: S, settings: BatchSettings) -> BatchResult<Self> {
        settings.validate()?;
        let directions = settings.direction_spec()?;
        Ok(Self {
            render,
            storage,
            settings,
            directions,
            observer: Box::new(NoopObserver),
            cancel: CancelHandle::default(),
            state: BatchState::Idle,
            pairs: Vec::new(),
            cursor: Cursor::default(),
            snapshot: None,
            rig_metadata: None,
            sheets: Vec::new(),
            metadata_files: Vec::new(),
            leftover_temps: Vec::new(),
            frames_done: 0,
            frames_total: 0,
            started: None,
            elapsed: Duration::ZERO,
            last_frame_secs: 0.0,
        })
    }

    /// Sets the progress observer.
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub fn directions(&self) -> &DirectionSpec {
        &self.directions
    }

    /// `(frames rendered, frames in the run)`.
    pub fn frame_counts(&self) -> (u64, u64) {
        (self.frames_done, self.frames_total)
    }

    /// Sheets persisted so far.
    pub fn sheets(&self) -> &[SheetRecord] {
        &self.sheets
    }

    pub fn render_service(&self) -> &R {
        &self.render
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_parts(self) -> (R, S) {
        (self.render, self.storage)
    }

    /// Handle that can cancel the run without borrowing the executor.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Requests cancellation. Takes effect at the next tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Freezes the plan and moves to `Running`.
    ///
    /// Nothing is rendered yet; the first unit runs on the first tick.
    #[instrument(skip_all, fields(rigs = plan.rigs().len()))]
    pub fn start(&mut self, plan: &PlanModel) -> BatchResult<()> {
        if self.state != BatchState::Idle {
            return Err(BatchError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        let pairs = freeze_plan(plan, &self.settings)?;
        if pairs.is_empty() {
            return Err(BatchError::EmptyPlan);
        }

        let per_frame = self.directions.count() as u64;
        self.frames_total = pairs.iter().map(|p| p.frames.len() as u64 * per_frame).sum();
        self.frames_done = 0;
        self.pairs = pairs;
        self.cursor = Cursor::default();
        self.sheets.clear();
        self.metadata_files.clear();
        self.leftover_temps.clear();
        self.rig_metadata = None;
        self.last_frame_secs = 0.0;
        self.elapsed = Duration::ZERO;

        self.cancel.reset();
        self.snapshot = Some(self.render.capture_state());
        self.started = Some(Instant::now());
        self.state = BatchState::Running;

        info!(
            pairs = self.pairs.len(),
            frames = self.frames_total,
            directions = self.directions.count(),
            "batch started"
        );
        Ok(())
    }

    /// Runs one unit of work and returns the state afterwards.
    ///
    /// Outside `Running` this does nothing. An error ends the run in
    /// `Failed` (after cleanup) and is returned.
    pub fn tick(&mut self) -> BatchResult<BatchState> {
        if self.state != BatchState::Running {
            return Ok(self.state);
        }

        if self.cancel.is_cancelled() {
            info!(frames = self.frames_done, "batch cancelled");
            self.finish(BatchState::Cancelled);
            return Ok(self.state);
        }

        if let Err(err) = self.step() {
            warn!(error = %err, "batch failed");
            self.finish(BatchState::Failed);
            return Err(err);
        }

        if self.cursor.pair >= self.pairs.len() {
            self.finish(BatchState::Completed);
        }
        Ok(self.state)
    }

    /// Ticks until the run leaves `Running`.
    pub fn run_to_completion(&mut self) -> BatchResult<BatchSummary> {
        if self.state == BatchState::Idle {
            return Err(BatchError::InvalidState {
                action: "run",
                state: self.state,
            });
        }
        while self.tick()? == BatchState::Running {}
        Ok(self.summary())
    }

    /// Returns a finished executor to `Idle` so it can start another run.
    pub fn reset(&mut self) -> BatchResult<()> {
        if self.state == BatchState::Running {
            return Err(BatchError::InvalidState {
                action: "reset",
                state: self.state,
            });
        }
        self.state = BatchState::Idle;
        self.pairs.clear();
        self.cursor = Cursor::default();
        Ok(())
    }

    /// Summary of the current or last run.
    pub fn summary(&self) -> BatchSummary {
        let elapsed = match (self.state, self.started) {
            (BatchState::Running, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        };
        BatchSummary {
            state: self.state,
            frames_rendered: self.frames_done,
            frames_total: self.frames_total,
            sheets: self.sheets.clone(),
            metadata_files: self.metadata_files.clone(),
            elapsed_secs: elapsed.as_secs_f64(),
            leftover_temps: self.leftover_temps.clone(),
        }
    }

    fn step(&mut self) -> BatchResult<()> {
        let pair_index = self.cursor.pair;
        let direction = self.cursor.direction;
        let frame_index = self.cursor.frame_index;

        let pair = self
            .pairs
            .get(pair_index)
            .ok_or(BatchError::InvalidState {
                action: "tick",
                state: self.state,
            })?;
        let frame = *pair
            .frames
            .get(frame_index)
            .ok_or(BatchError::InvalidState {
                action: "tick",
                state: self.state,
            })?;
        let render_error = |source: RenderServiceError| BatchError::RenderService {
            rig: pair.rig.clone(),
            clip: pair.clip.clone(),
            direction,
            frame,
            source,
        };

        self.render
            .set_frame(&pair.rig, &pair.clip, frame)
            .map_err(&render_error)?;
        self.render
            .set_rotation(&pair.rotate_object, self.directions.angle(direction))
            .map_err(&render_error)?;

        let started = Instant::now();
        let image = render_with_retries(&mut self.render, self.settings.render_retries)
            .map_err(&render_error)?;
        self.last_frame_secs = started.elapsed().as_secs_f64();

        let path = temp_frame_path(&self.settings.temp_subdir, pair, direction, frame_index);
        self.storage.write_temp_image(&path, &image)?;
        self.cursor.temps.insert((direction, frame_index as u32), path);
        self.frames_done += 1;

        debug!(
            rig = %pair.rig,
            clip = %pair.clip,
            direction,
            frame,
            secs = self.last_frame_secs,
            "rendered frame"
        );

        let frames_in_clip = pair.frames.len();
        self.observer.on_progress(&Progress {
            rig: &pair.rig,
            clip: &pair.clip,
            direction,
            direction_count: self.directions.count(),
            frame,
            frame_index: frame_index as u32,
            frames_in_clip: frames_in_clip as u32,
            pair_index,
            pair_count: self.pairs.len(),
            frames_done: self.frames_done,
            frames_total: self.frames_total,
            last_frame_secs: self.last_frame_secs,
        });

        if frame_index + 1 < frames_in_clip {
            self.cursor.frame_index += 1;
            return Ok(());
        }
        self.cursor.frame_index = 0;
        if direction + 1 < self.directions.count() {
            self.cursor.direction += 1;
            return Ok(());
        }
        self.cursor.direction = 0;

        self.complete_pair(pair_index)?;
        self.cursor.pair += 1;
        Ok(())
    }

    /// Assembles and persists the sheet of a fully rendered pair.
    fn complete_pair(&mut self, pair_index: usize) -> BatchResult<()> {
        let pair = &self.pairs[pair_index];
        let grid = SheetGrid::new(
            self.directions.count(),
            pair.frames.len() as u32,
            self.settings.rows_per_direction,
        );

        let mut frames = BTreeMap::new();
        for (key, path) in &self.cursor.temps {
            frames.insert(*key, self.storage.read_image(path)?);
        }
        let sheet = assemble_sheet(&pair.rig, &pair.clip, grid, &frames)?;
        drop(frames);

        let path = self.settings.output_dir.join(sheet.file_name());
        let hash = self.storage.write_image(&path, &sheet.image)?;
        let record = SheetRecord {
            rig: pair.rig.clone(),
            clip: pair.clip.clone(),
            path,
            hash,
            width: sheet.image.width(),
            height: sheet.image.height(),
            grid,
        };
        info!(
            rig = %record.rig,
            clip = %record.clip,
            path = %record.path.display(),
            width = record.width,
            height = record.height,
            "wrote sheet"
        );
        self.observer.on_sheet_written(&record);
        self.sheets.push(record);

        if pair.emit_metadata {
            let animations = emit_animations(&sheet, &self.directions, &pair.playback);
            self.rig_metadata
                .get_or_insert_with(|| AnimationMetadata::new(pair.rig.clone()))
                .animations
                .extend(animations);
        }
        if pair.last_of_rig {
            if let Some(metadata) = self.rig_metadata.take() {
                let files = write_metadata(&mut self.storage, &self.settings, &metadata)?;
                self.metadata_files.extend(files);
            }
        }

        let temps = std::mem::take(&mut self.cursor.temps);
        let leftover = delete_temps(&mut self.storage, &temps);
        self.leftover_temps.extend(leftover);
        Ok(())
    }

    /// Cleans up and enters a terminal state.
    fn finish(&mut self, state: BatchState) {
        let temps = std::mem::take(&mut self.cursor.temps);
        let leftover = delete_temps(&mut self.storage, &temps);
        self.leftover_temps.extend(leftover);

        if let Some(snapshot) = self.snapshot.take() {
            self.render.restore_state(&snapshot);
        }
        // Metadata for a rig whose sheets did not all finish is dropped.
        self.rig_metadata = None;

        if let Some(started) = self.started {
            self.elapsed = started.elapsed();
        }
        self.state = state;

        if !self.leftover_temps.is_empty() {
            warn!(count = self.leftover_temps.len(), "temp frames left behind");
        }
        info!(
            state = %state,
            frames = self.frames_done,
            sheets = self.sheets.len(),
            elapsed_secs = self.elapsed.as_secs_f64(),
            "batch finished"
        );
        self.observer.on_finished(state);
    }
}

/// Copies the enabled pairs out of the plan, resolving rotation targets.
fn freeze_plan(plan: &PlanModel, settings: &BatchSettings) -> BatchResult<Vec<PairJob>> {
    let mut pairs = Vec::new();
    for rig in plan.rigs() {
        let clips: Vec<_> = rig.active_clips().collect();
        let Some(last) = clips.len().checked_sub(1) else {
            continue;
        };

        let rotate_object = match settings.rotation_target {
            RotationTarget::Rig => rig.id().to_string(),
            RotationTarget::Camera => rig
                .camera()
                .or(settings.camera.as_deref())
                .map(str::to_string)
                .ok_or_else(|| BatchError::MissingCamera {
                    rig: rig.id().to_string(),
                })?,
        };

        for (i, clip) in clips.into_iter().enumerate() {
            let frames = clip.frame_range(settings.frame_step).frames();
            if frames.is_empty() {
                return Err(BatchError::EmptyFrameRange {
                    rig: rig.id().to_string(),
                    clip: clip.clip().to_string(),
                    start: clip.start(),
                    end: clip.end(),
                });
            }
            pairs.push(PairJob {
                rig: rig.id().to_string(),
                clip: clip.clip().to_string(),
                frames,
                rotate_object: rotate_object.clone(),
                playback: ClipPlayback {
                    reverse: clip.reverse(),
                    looping: clip.looping(),
                    fps: settings.metadata_fps,
                },
                emit_metadata: rig.emit_metadata(),
                last_of_rig: i == last,
            });
        }
    }
    check_output_paths(&pairs, settings)?;
    Ok(pairs)
}

/// Rejects runs where file name sanitizing maps two pairs (or two rigs'
/// metadata) onto the same output file.
fn check_output_paths(pairs: &[PairJob], settings: &BatchSettings) -> BatchResult<()> {
    let mut owners: BTreeMap<PathBuf, String> = BTreeMap::new();
    let mut claim = |path: PathBuf, pair: &PairJob, owner: String| match owners.get(&path) {
        Some(other) if *other != owner => Err(BatchError::OutputCollision {
            rig: pair.rig.clone(),
            clip: pair.clip.clone(),
            path,
            other: other.clone(),
        }),
        _ => {
            owners.insert(path, owner);
            Ok(())
        }
    };

    for pair in pairs {
        let sheet = settings.output_dir.join(sheet_file_name(&pair.rig, &pair.clip));
        claim(sheet, pair, format!("{}/{}", pair.rig, pair.clip))?;
        if pair.emit_metadata {
            let (json, tres) = metadata_paths(settings, &pair.rig);
            for path in std::iter::once(json).chain(tres) {
                claim(path, pair, pair.rig.clone())?;
            }
        }
    }
    Ok(())
}

fn render_with_retries<R: RenderService>(
    render: &mut R,
    retries: u32,
) -> Result<FrameImage, RenderServiceError> {
    let mut attempt = 0;
    loop {
        match render.render_current_frame() {
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                warn!(attempt, retries, error = %err, "retrying render");
            }
            result => return result,
        }
    }
}

fn temp_frame_path(temp_dir: &Path, pair: &PairJob, direction: u32, frame_index: usize) -> PathBuf {
    temp_dir
        .join(format!("{}_{}", file_safe(&pair.rig), file_safe(&pair.clip)))
        .join(format!("d{:02}_{:05}.png", direction, frame_index))
}

/// Metadata files written for a rig: the JSON, and the `.tres` if enabled.
fn metadata_paths(settings: &BatchSettings, rig: &str) -> (PathBuf, Option<PathBuf>) {
    let stem = file_safe(rig);
    let json = settings.output_dir.join(format!("{stem}.json"));
    let tres = settings
        .godot_export
        .then(|| settings.output_dir.join(format!("{stem}.tres")));
    (json, tres)
}

fn write_metadata<S: Storage>(
    storage: &mut S,
    settings: &BatchSettings,
    metadata: &AnimationMetadata,
) -> BatchResult<Vec<PathBuf>> {
    let (json_path, tres_path) = metadata_paths(settings, &metadata.rig);
    storage.write_text(&json_path, &metadata.to_json_pretty()?)?;
    let mut files = vec![json_path];

    if let Some(tres_path) = tres_path {
        storage.write_text(
            &tres_path,
            &sprite_frames_tres(metadata, &settings.godot_resource_dir),
        )?;
        files.push(tres_path);
    }

    debug!(rig = %metadata.rig, animations = metadata.animations.len(), "wrote metadata");
    Ok(files)
}

/// Deletes temp frames, returning the ones that could not be deleted.
fn delete_temps<S: Storage>(
    storage: &mut S,
    temps: &BTreeMap<(u32, u32), PathBuf>,
) -> Vec<PathBuf> {
    let mut leftover = Vec::new();
    for path in temps.values() {
        if let Err(err) = storage.delete_temp(path) {
            warn!(path = %path.display(), error = %err, "failed to delete temp frame");
            leftover.push(path.clone());
        }
    }
    leftover
}
