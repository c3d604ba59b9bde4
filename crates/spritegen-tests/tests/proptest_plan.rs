//! Property-based tests for plan editing, frame sampling, and estimates.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p spritegen-tests --test proptest_plan
//! ```

use proptest::prelude::*;

use spritegen_plan::{
    estimate, ClipRange, DirectionSpec, FrameRange, PlanModel, RenderHistory, RigPlan,
    SheetGrid,
};
use spritegen_tests::reference_plan;

const LIMIT: i32 = 500;

// ============================================================================
// 1. Range edits
// ============================================================================

#[derive(Debug, Clone)]
enum Edit {
    Range(i32, i32),
    Start(i32),
    End(i32),
    Reset,
}

fn bound() -> impl Strategy<Value = i32> {
    -(LIMIT + 50)..=(LIMIT + 50)
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (bound(), bound()).prop_map(|(s, e)| Edit::Range(s, e)),
        bound().prop_map(Edit::Start),
        bound().prop_map(Edit::End),
        Just(Edit::Reset),
    ]
}

fn apply(plan: &mut PlanModel, edit: &Edit) -> bool {
    let result = match *edit {
        Edit::Range(s, e) => plan.set_clip_range("knight", "walk", s, e),
        Edit::Start(s) => plan.set_clip_start("knight", "walk", s),
        Edit::End(e) => plan.set_clip_end("knight", "walk", e),
        Edit::Reset => plan.reset_clip_range("knight", "walk", true),
    };
    result.is_ok()
}

fn walk_bounds(plan: &PlanModel) -> (i32, i32) {
    let walk = plan.rig("knight").unwrap().clip("walk").unwrap();
    (walk.start(), walk.end())
}

proptest! {
    /// Any edit sequence keeps the range ordered and inside the limit.
    #[test]
    fn edits_keep_range_valid(edits in prop::collection::vec(edit(), 1..40)) {
        let mut plan = reference_plan().with_frame_limit(LIMIT);
        for edit in &edits {
            apply(&mut plan, edit);
            let (start, end) = walk_bounds(&plan);
            prop_assert!(start <= end, "{:?} gave {}..{}", edit, start, end);
            prop_assert!(start >= -LIMIT && end <= LIMIT);
        }
    }

    /// A rejected edit leaves the whole plan untouched.
    #[test]
    fn rejected_edits_change_nothing(edits in prop::collection::vec(edit(), 1..40)) {
        let mut plan = reference_plan().with_frame_limit(LIMIT);
        for edit in &edits {
            let before = plan.clone();
            if !apply(&mut plan, edit) {
                prop_assert_eq!(&plan, &before);
            }
        }
    }

    /// Accepted range edits land exactly.
    #[test]
    fn accepted_ranges_are_stored(s in bound(), e in bound()) {
        let mut plan = reference_plan().with_frame_limit(LIMIT);
        if plan.set_clip_range("knight", "walk", s, e).is_ok() {
            prop_assert_eq!(walk_bounds(&plan), (s, e));
        } else {
            prop_assert!(s > e || s.abs() > LIMIT || e.abs() > LIMIT);
        }
    }
}

// ============================================================================
// 2. Frame sampling
// ============================================================================

proptest! {
    /// Sampled frames start at the start, end at the end, and increase.
    #[test]
    fn frames_cover_the_range(start in -200i32..200, len in 1i32..120, step in 1u32..16) {
        let range = FrameRange::new(start, start + len - 1, step);
        let frames = range.frames();

        prop_assert_eq!(frames.first().copied(), Some(range.start));
        prop_assert_eq!(frames.last().copied(), Some(range.end));
        prop_assert!(frames.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(frames.windows(2).all(|w| w[1] - w[0] <= step as i32));
        prop_assert_eq!(frames.len() as u32, range.rendered_count());
        prop_assert!(range.rendered_count() - range.stepped_count() <= 1);
    }

    /// Every direction's frames get a distinct cell inside the grid.
    #[test]
    fn grid_cells_are_distinct(directions in 1u32..9, frames in 1u32..30, rows in 1u32..5) {
        let grid = SheetGrid::new(directions, frames, rows);
        let mut seen = std::collections::BTreeSet::new();
        for d in 0..directions {
            for i in 0..frames {
                let (column, row) = grid.cell(d, i);
                prop_assert!(column < grid.columns && row < grid.rows);
                prop_assert!(seen.insert((column, row)));
            }
        }
        prop_assert_eq!(seen.len() as u32, grid.frame_count());
    }
}

// ============================================================================
// 3. Estimates
// ============================================================================

fn clip_lengths() -> impl Strategy<Value = Vec<(i32, bool)>> {
    prop::collection::vec((1i32..50, any::<bool>()), 1..6)
}

proptest! {
    /// frames = Σ directions × ceil(len / step) over enabled clips.
    #[test]
    fn estimate_matches_formula(
        clips in clip_lengths(),
        directions in 1u32..17,
        step in 1u32..8,
    ) {
        let mut rig = RigPlan::new("knight");
        for (i, (len, _)) in clips.iter().enumerate() {
            rig = rig.with_clip(ClipRange::new(format!("clip{i}"), 0, len - 1));
        }
        let mut plan = PlanModel::new();
        plan.push_rig(rig).unwrap();
        for (i, (_, enabled)) in clips.iter().enumerate() {
            plan.set_clip_enabled("knight", &format!("clip{i}"), *enabled).unwrap();
        }

        let expected: u64 = clips
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(len, _)| (*len as u64).div_ceil(step as u64) * directions as u64)
            .sum();
        let sheets = clips.iter().filter(|(_, enabled)| *enabled).count() as u32;

        let workload = estimate(
            &plan,
            &DirectionSpec::new(directions).unwrap(),
            step,
            &RenderHistory::default(),
        );
        prop_assert_eq!(workload.total_frames, expected);
        prop_assert_eq!(workload.total_sheets, sheets);
    }
}
