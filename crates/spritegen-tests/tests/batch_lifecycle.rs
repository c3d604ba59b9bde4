//! Full batch runs against the filesystem.
//!
//! Each test drives a [`BatchExecutor`] with the scripted renderer into a
//! temporary directory and inspects what ends up on disk.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p spritegen-tests --test batch_lifecycle
//! ```

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use spritegen_batch::png::hash_png;
use spritegen_batch::{
    BatchError, BatchExecutor, BatchState, FsStorage, Progress, RenderService, RenderServiceError,
};
use spritegen_plan::{BatchSettings, ClipRange, PlanModel, RigPlan, RotationTarget};
use spritegen_tests::{decode_png, reference_plan, FakeRenderService, OutputFixture, RenderCall};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

fn settings() -> BatchSettings {
    BatchSettings::default().with_directions(4)
}

fn executor(
    out: &OutputFixture,
    render: FakeRenderService,
    settings: BatchSettings,
) -> BatchExecutor<FakeRenderService, FsStorage> {
    BatchExecutor::new(render, out.storage(), settings).unwrap()
}

// ============================================================================
// Completed runs
// ============================================================================

#[test]
fn completed_run_writes_sheets_and_metadata_only() {
    init_tracing();
    let out = OutputFixture::new();
    let mut exec = executor(&out, FakeRenderService::new(4, 4), settings());

    exec.start(&reference_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();

    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(summary.frames_rendered, 4 * 4 * 8);
    assert_eq!(summary.frames_total, summary.frames_rendered);

    let expected: Vec<PathBuf> = [
        "archer.json",
        "archer.tres",
        "archer_idle.png",
        "archer_walk.png",
        "knight.json",
        "knight.tres",
        "knight_idle.png",
        "knight_walk.png",
    ]
    .iter()
    .map(|f| PathBuf::from("spritesheets").join(f))
    .collect();
    assert_eq!(out.files(), expected);
    assert!(!out.exists(".spritegen-frames"));
}

#[test]
fn sheets_are_recorded_in_plan_order_with_hashes() {
    let out = OutputFixture::new();
    let mut exec = executor(&out, FakeRenderService::new(4, 4), settings());
    exec.start(&reference_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();

    let order: Vec<_> = summary
        .sheets
        .iter()
        .map(|s| format!("{}/{}", s.rig, s.clip))
        .collect();
    assert_eq!(
        order,
        vec!["knight/idle", "knight/walk", "archer/idle", "archer/walk"]
    );

    for sheet in &summary.sheets {
        let bytes = fs::read(out.path().join(&sheet.path)).unwrap();
        assert_eq!(sheet.hash, hash_png(&bytes));
        assert_eq!((sheet.width, sheet.height), (32, 16));
        assert_eq!((sheet.grid.columns, sheet.grid.rows), (8, 4));
    }
}

#[test]
fn sheet_pixels_follow_direction_and_frame() {
    let out = OutputFixture::new();
    let mut exec = executor(&out, FakeRenderService::new(4, 4), settings());
    exec.start(&reference_plan()).unwrap();
    exec.run_to_completion().unwrap();

    let sheet = decode_png(&out.path().join("spritesheets/knight_walk.png"));
    assert_eq!((sheet.width, sheet.height), (32, 16));
    for direction in 0..4u32 {
        for frame in 0..8u32 {
            let color = FakeRenderService::color_for(frame as i32, direction as f64 * 90.0);
            assert!(
                sheet.region_is(frame * 4, direction * 4, 4, 4, color),
                "cell for direction {direction}, frame {frame}"
            );
        }
    }
}

#[test]
fn identical_runs_write_identical_sheets() {
    let hashes = |_: u32| {
        let out = OutputFixture::new();
        let mut exec = executor(&out, FakeRenderService::new(4, 4), settings());
        exec.start(&reference_plan()).unwrap();
        exec.run_to_completion()
            .unwrap()
            .sheets
            .into_iter()
            .map(|s| s.hash)
            .collect::<Vec<_>>()
    };
    assert_eq!(hashes(0), hashes(1));
}

#[test]
fn stepped_frames_include_the_last_frame() {
    let out = OutputFixture::new();
    let mut plan = PlanModel::new();
    plan.push_rig(RigPlan::new("knight").with_clip(ClipRange::new("walk", 0, 10)))
        .unwrap();
    let settings = BatchSettings::default().with_directions(1).with_frame_step(3);
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings);

    exec.start(&plan).unwrap();
    exec.run_to_completion().unwrap();

    let frames: Vec<i32> = exec
        .render_service()
        .calls()
        .iter()
        .filter_map(|c| match c {
            RenderCall::SetFrame { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec![0, 3, 6, 9, 10]);

    let sheet = decode_png(&out.path().join("spritesheets/knight_walk.png"));
    assert_eq!((sheet.width, sheet.height), (10, 2));
    assert_eq!(sheet.pixel(8, 0), FakeRenderService::color_for(10, 0.0));
}

#[test]
fn clips_may_differ_in_frame_size() {
    let out = OutputFixture::new();
    let render = FakeRenderService::new(4, 4).with_clip_size("walk", 6, 8);
    let mut exec = executor(&out, render, settings());
    exec.start(&reference_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();

    let walk = summary.sheets.iter().find(|s| s.clip == "walk").unwrap();
    assert_eq!((walk.width, walk.height), (48, 32));
    let idle = summary.sheets.iter().find(|s| s.clip == "idle").unwrap();
    assert_eq!((idle.width, idle.height), (32, 16));
}

// ============================================================================
// Scene restoration and progress
// ============================================================================

#[test]
fn scene_state_is_restored_after_completion() {
    let out = OutputFixture::new();
    let render = FakeRenderService::new(4, 4);
    let before = render.capture_state();
    let mut exec = executor(&out, render, settings());

    exec.start(&reference_plan()).unwrap();
    exec.run_to_completion().unwrap();

    assert_eq!(exec.render_service().scene(), &before);
    assert_eq!(exec.render_service().calls().last(), Some(&RenderCall::Restore));
}

#[test]
fn progress_is_reported_per_frame() {
    let out = OutputFixture::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings()).with_observer(
        move |p: &Progress<'_>| {
            sink.borrow_mut().push((
                p.rig.to_string(),
                p.clip.to_string(),
                p.direction,
                p.frames_done,
                p.frames_total,
            ))
        },
    );

    exec.start(&reference_plan()).unwrap();
    exec.run_to_completion().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 128);
    assert_eq!(seen[0], ("knight".to_string(), "idle".to_string(), 0, 1, 128));
    assert_eq!(seen[8].2, 1, "second direction starts after eight frames");
    assert_eq!(seen[127], ("archer".to_string(), "walk".to_string(), 3, 128, 128));
}

#[test]
fn camera_rotation_targets_the_rig_camera() {
    let out = OutputFixture::new();
    let mut plan = reference_plan();
    plan.set_rig_camera("knight", Some("knight_cam".to_string()))
        .unwrap();
    let settings = settings()
        .with_rotation_target(RotationTarget::Camera)
        .with_camera("main_cam");
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings);

    exec.start(&plan).unwrap();
    exec.run_to_completion().unwrap();

    let rotated: Vec<_> = exec
        .render_service()
        .calls()
        .iter()
        .filter_map(|c| match c {
            RenderCall::SetRotation { object, .. } => Some(object.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(rotated.first(), Some(&"knight_cam"));
    assert_eq!(rotated.last(), Some(&"main_cam"));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn fatal_render_error_fails_with_context_and_cleans_up() {
    let out = OutputFixture::new();
    // Render 33: first unit of knight/walk.
    let render = FakeRenderService::new(2, 2).fail_at(33, 1, RenderServiceError::fatal("gpu lost"));
    let before = render.capture_state();
    let mut exec = executor(&out, render, settings());

    exec.start(&reference_plan()).unwrap();
    let err = exec.run_to_completion().unwrap_err();

    match &err {
        BatchError::RenderService {
            rig,
            clip,
            direction,
            frame,
            ..
        } => {
            assert_eq!((rig.as_str(), clip.as_str()), ("knight", "walk"));
            assert_eq!((*direction, *frame), (0, 0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(exec.state(), BatchState::Failed);
    assert_eq!(
        out.files(),
        vec![PathBuf::from("spritesheets/knight_idle.png")]
    );
    assert_eq!(exec.render_service().scene(), &before);
}

#[test]
fn transient_errors_within_retries_do_not_fail() {
    let out = OutputFixture::new();
    let render =
        FakeRenderService::new(2, 2).fail_at(5, 2, RenderServiceError::transient("device busy"));
    let mut exec = executor(&out, render, settings().with_render_retries(2));

    exec.start(&reference_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();
    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(summary.frames_rendered, 128);
    assert_eq!(exec.render_service().render_count(), 130);
}

#[test]
fn transient_errors_beyond_retries_fail() {
    let out = OutputFixture::new();
    let render =
        FakeRenderService::new(2, 2).fail_at(5, 3, RenderServiceError::transient("device busy"));
    let mut exec = executor(&out, render, settings().with_render_retries(2));

    exec.start(&reference_plan()).unwrap();
    let err = exec.run_to_completion().unwrap_err();
    assert!(matches!(err, BatchError::RenderService { .. }));
    assert!(out.files_in(".spritegen-frames").is_empty());
}

#[test]
fn frame_size_change_within_a_sheet_fails_the_run() {
    let out = OutputFixture::new();
    // Render 12: knight/idle, direction 1, frame index 3.
    let render = FakeRenderService::new(4, 4).with_render_size(12, 4, 5);
    let before = render.capture_state();
    let mut exec = executor(&out, render, settings());

    exec.start(&reference_plan()).unwrap();
    let err = exec.run_to_completion().unwrap_err();
    match err {
        BatchError::DimensionMismatch {
            rig,
            clip,
            direction,
            frame_index,
            expected,
            actual,
        } => {
            assert_eq!((rig.as_str(), clip.as_str()), ("knight", "idle"));
            assert_eq!((direction, frame_index), (1, 3));
            assert_eq!(expected, (4, 4));
            assert_eq!(actual, (4, 5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.files().is_empty());
    assert_eq!(exec.render_service().scene(), &before);
}

#[test]
fn empty_plan_never_starts() {
    let out = OutputFixture::new();
    let mut plan = reference_plan();
    plan.deselect_all();
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings());

    assert!(matches!(exec.start(&plan), Err(BatchError::EmptyPlan)));
    assert_eq!(exec.state(), BatchState::Idle);
    assert!(exec.render_service().calls().is_empty());
}

#[test]
fn plan_edits_after_start_do_not_affect_the_run() {
    let out = OutputFixture::new();
    let mut plan = reference_plan();
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings());

    exec.start(&plan).unwrap();
    plan.deselect_all();
    let summary = exec.run_to_completion().unwrap();
    assert_eq!(summary.sheets.len(), 4);
}

#[test]
fn ids_that_sanitize_alike_never_start() {
    let out = OutputFixture::new();
    let mut plan = PlanModel::new();
    plan.push_rig(RigPlan::new("a b").with_clip(ClipRange::new("idle", 0, 1)))
        .unwrap();
    plan.push_rig(RigPlan::new("a_b").with_clip(ClipRange::new("idle", 0, 1)))
        .unwrap();
    let mut exec = executor(&out, FakeRenderService::new(2, 2), settings());

    let err = exec.start(&plan).unwrap_err();
    assert!(matches!(err, BatchError::OutputCollision { ref rig, .. } if rig == "a_b"));
    assert_eq!(exec.state(), BatchState::Idle);
    assert!(exec.render_service().calls().is_empty());
    assert!(out.files().is_empty());
}
