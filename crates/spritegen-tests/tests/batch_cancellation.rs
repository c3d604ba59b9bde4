//! Cancellation at every unit of a run.
//!
//! Cancelling after N units must leave exactly the sheets of pairs that
//! finished within those N units, no temporary frames, and the scene as it
//! was before the run.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p spritegen-tests --test batch_cancellation
//! ```

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use spritegen_batch::{BatchExecutor, BatchState, CancelHandle, Progress, RenderService};
use spritegen_plan::{BatchSettings, ClipRange, PlanModel, RigPlan};
use spritegen_tests::{FakeRenderService, OutputFixture};

/// knight/idle: 3 frames, knight/walk: 2 frames, archer/idle: 2 frames.
fn small_plan() -> PlanModel {
    let mut plan = PlanModel::new();
    plan.push_rig(
        RigPlan::new("knight")
            .with_clip(ClipRange::new("idle", 0, 2))
            .with_clip(ClipRange::new("walk", 4, 5)),
    )
    .unwrap();
    plan.push_rig(RigPlan::new("archer").with_clip(ClipRange::new("idle", 0, 1)))
        .unwrap();
    plan
}

fn settings() -> BatchSettings {
    BatchSettings::default().with_directions(2)
}

/// Units after which each pair's sheet exists, with the files that appear.
const MILESTONES: [(u64, &[&str]); 3] = [
    (6, &["knight_idle.png"]),
    (10, &["knight.json", "knight.tres", "knight_walk.png"]),
    (14, &["archer.json", "archer.tres", "archer_idle.png"]),
];

fn expected_files(units: u64) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = MILESTONES
        .iter()
        .filter(|(at, _)| *at <= units)
        .flat_map(|(_, names)| names.iter())
        .map(|name| PathBuf::from("spritesheets").join(name))
        .collect();
    files.sort();
    files
}

#[test]
fn cancelling_after_each_unit() {
    for units in 0..14u64 {
        let out = OutputFixture::new();
        let render = FakeRenderService::new(2, 2);
        let before = render.capture_state();
        let mut exec = BatchExecutor::new(render, out.storage(), settings()).unwrap();

        exec.start(&small_plan()).unwrap();
        for _ in 0..units {
            assert_eq!(exec.tick().unwrap(), BatchState::Running);
        }
        exec.cancel();
        assert_eq!(exec.tick().unwrap(), BatchState::Cancelled, "after {units} units");

        assert_eq!(out.files(), expected_files(units), "after {units} units");
        assert!(
            out.files_in(".spritegen-frames").is_empty(),
            "temp frames left after {units} units"
        );
        assert_eq!(exec.render_service().scene(), &before, "after {units} units");
        assert_eq!(exec.frame_counts(), (units, 14));

        let completed = MILESTONES.iter().filter(|(at, _)| *at <= units).count();
        assert_eq!(exec.summary().sheets.len(), completed);
    }
}

#[test]
fn the_last_unit_completes_instead() {
    let out = OutputFixture::new();
    let mut exec = BatchExecutor::new(FakeRenderService::new(2, 2), out.storage(), settings())
        .unwrap();
    exec.start(&small_plan()).unwrap();
    for _ in 0..13 {
        exec.tick().unwrap();
    }
    assert_eq!(exec.tick().unwrap(), BatchState::Completed);

    // Too late: the run already finished.
    exec.cancel();
    assert_eq!(exec.tick().unwrap(), BatchState::Completed);
    assert_eq!(out.files(), expected_files(14));
}

#[test]
fn cancel_from_a_progress_callback() {
    let out = OutputFixture::new();
    let handle = CancelHandle::default();
    let exec = BatchExecutor::new(FakeRenderService::new(2, 2), out.storage(), settings())
        .unwrap();
    let mut exec = {
        let remote = exec.cancel_handle();
        exec.with_observer(move |p: &Progress<'_>| {
            if p.frames_done == 8 {
                remote.cancel();
            }
        })
    };
    // An unrelated handle never affects this executor.
    handle.cancel();

    exec.start(&small_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();

    assert_eq!(summary.state, BatchState::Cancelled);
    assert_eq!(summary.frames_rendered, 8);
    assert_eq!(out.files(), expected_files(8));
    assert!(summary.render_sample().is_some());
}

#[test]
fn stale_cancel_before_start_is_ignored() {
    let out = OutputFixture::new();
    let mut exec = BatchExecutor::new(FakeRenderService::new(2, 2), out.storage(), settings())
        .unwrap();
    exec.cancel();
    exec.start(&small_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();
    assert_eq!(summary.state, BatchState::Completed);
}

#[test]
fn cancelled_executor_can_run_again() {
    let out = OutputFixture::new();
    let mut exec = BatchExecutor::new(FakeRenderService::new(2, 2), out.storage(), settings())
        .unwrap();
    exec.start(&small_plan()).unwrap();
    exec.tick().unwrap();
    exec.cancel_handle().cancel();
    exec.tick().unwrap();
    assert_eq!(exec.state(), BatchState::Cancelled);

    exec.reset().unwrap();
    exec.start(&small_plan()).unwrap();
    let summary = exec.run_to_completion().unwrap();
    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(summary.frames_rendered, 14);
    assert_eq!(out.files(), expected_files(14));
}
