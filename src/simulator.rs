use crate::cell::SearchMark;
use crate::grid::{GridMap, Pos};
use crate::occupancy::Occupancy;
use crate::palette::{self, Rgb};
use crate::recorder::FrameRecorder;
use crate::search::{Path, SearchEngine, SearchStep};
use log::{debug, info};
use std::fmt;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Full-visibility search finished and the path was revealed.
    PathFound,
    /// The goal is unreachable from the start (or current position).
    NoPath,
    /// The roaming agent reached the goal.
    Arrived,
    /// The session was cancelled from outside mid-run.
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::PathFound => "path found",
            Outcome::NoPath => "no path found",
            Outcome::Arrived => "arrived at goal",
            Outcome::Cancelled => "cancelled",
        };
        write!(f, "{}", text)
    }
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// No run is active.
    Idle,
    /// The run advanced by one step/iteration and continues.
    Running,
    Finished(Outcome),
}

/// Diagnostic classification of one cell during a roaming iteration,
/// recomputed from scratch every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Diag {
    /// Start/goal keep their designation color; no override is written.
    Endpoint,
    CurrentPosition,
    /// A true obstacle the agent has not sensed yet.
    UnknownObstacle,
    /// A true obstacle present in the occupancy snapshot.
    KnownObstacle,
    /// Free cell inside the sensing square.
    FieldOfView,
    PlannedPath,
    /// A planned-path cell that is simultaneously a known obstacle: a stale
    /// plan about to be discarded.
    Collision,
    Plain,
}

impl Diag {
    fn color(self) -> Option<Rgb> {
        match self {
            Diag::Endpoint => None,
            Diag::CurrentPosition => Some(palette::CURRENT_POSITION),
            Diag::UnknownObstacle => Some(palette::UNKNOWN_OBSTACLE),
            Diag::KnownObstacle => Some(palette::OBSTACLE),
            Diag::FieldOfView => Some(palette::FIELD_OF_VIEW),
            Diag::PlannedPath => Some(palette::PATH),
            Diag::Collision => Some(palette::COLLISION),
            Diag::Plain => Some(palette::DEFAULT),
        }
    }
}

enum Phase {
    Idle,
    /// Stepwise full-visibility search: one engine step per tick.
    Searching,
    /// Animated reveal of the found path, one cell per tick.
    Revealing { path: Path, next: usize },
    /// Local-sensing replanning loop: one full
    /// sense/classify/plan/move iteration per tick.
    Roaming { position: Pos, goal: Pos, radius: i32 },
}

/// Drives a search engine against the grid, one observable step per `tick`.
///
/// The host frame loop is the only scheduler: the driver suspends by
/// returning from `tick` and is re-entered on the next frame. Cancellation
/// is cooperative, polled at the top of every tick.
pub struct Simulator<E: SearchEngine> {
    engine: E,
    occupancy: Occupancy,
    recorder: FrameRecorder,
    phase: Phase,
    cancel_requested: bool,
    capture: bool,
    last_outcome: Option<Outcome>,
}

impl<E: SearchEngine> Simulator<E> {
    pub fn new(engine: E, recorder: FrameRecorder) -> Self {
        Simulator {
            engine,
            occupancy: Occupancy::new(0, 0),
            recorder,
            phase: Phase::Idle,
            cancel_requested: false,
            capture: false,
            last_outcome: None,
        }
    }

    /// Enable or disable frame capture for subsequent runs.
    pub fn set_capture(&mut self, capture: bool) {
        self.capture = capture;
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// True while the local-sensing loop is active (the host paces these
    /// ticks; stepwise search ticks every frame).
    pub fn is_roaming(&self) -> bool {
        matches!(self.phase, Phase::Roaming { .. })
    }

    /// Agent position of an active roaming run.
    pub fn roaming_position(&self) -> Option<Pos> {
        match self.phase {
            Phase::Roaming { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Ask the active run to unwind at its next tick.
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Occupancy snapshot of the current (or last) run.
    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn recorder(&self) -> &FrameRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut FrameRecorder {
        &mut self.recorder
    }

    fn require_endpoints(&self, grid: &GridMap) -> Result<(Pos, Pos), String> {
        match (grid.start(), grid.goal()) {
            (Some(start), Some(goal)) => Ok((start, goal)),
            _ => Err("start and goal must both be placed before a run".to_string()),
        }
    }

    /// Begin a stepwise full-visibility search run.
    ///
    /// The occupancy snapshot is rebuilt from the grid's current obstacle
    /// layout and the engine is reset before anything else happens.
    pub fn start_search_run(&mut self, grid: &mut GridMap) -> Result<(), String> {
        let (start, goal) = self.require_endpoints(grid)?;
        self.engine.reset();
        grid.clear_run_state();
        self.occupancy = Occupancy::from_grid(grid);
        self.cancel_requested = false;
        self.last_outcome = None;
        self.engine.begin(&self.occupancy, start, goal);
        self.phase = Phase::Searching;
        info!("search run started: {:?} -> {:?}", start, goal);
        Ok(())
    }

    /// Begin a local-sensing replanning run with the given Chebyshev sensing
    /// radius. The agent starts at the grid's start cell knowing nothing
    /// about obstacles.
    pub fn start_roaming_run(&mut self, grid: &mut GridMap, radius: i32) -> Result<(), String> {
        let (start, goal) = self.require_endpoints(grid)?;
        self.engine.reset();
        grid.clear_run_state();
        self.occupancy = Occupancy::new(grid.rows, grid.cols);
        self.cancel_requested = false;
        self.last_outcome = None;
        self.phase = Phase::Roaming {
            position: start,
            goal,
            radius: radius.max(0),
        };
        info!("roaming run started: {:?} -> {:?}, radius {}", start, goal, radius);
        Ok(())
    }

    /// Advance the active run by one observable step.
    pub fn tick(&mut self, grid: &mut GridMap) -> TickStatus {
        if self.cancel_requested && self.is_running() {
            self.cancel_requested = false;
            return self.finish(Outcome::Cancelled);
        }

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => TickStatus::Idle,
            Phase::Searching => self.tick_search(grid),
            Phase::Revealing { path, next } => self.tick_reveal(grid, path, next),
            Phase::Roaming { position, goal, radius } => {
                self.tick_roam(grid, position, goal, radius)
            }
        }
    }

    /// Run the active session to completion (headless use; no pacing).
    pub fn drive(&mut self, grid: &mut GridMap) -> Option<Outcome> {
        loop {
            match self.tick(grid) {
                TickStatus::Idle => return self.last_outcome,
                TickStatus::Running => {}
                TickStatus::Finished(outcome) => return Some(outcome),
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> TickStatus {
        self.phase = Phase::Idle;
        self.last_outcome = Some(outcome);
        info!("run finished: {}", outcome);
        TickStatus::Finished(outcome)
    }

    fn capture_frame(&mut self, grid: &GridMap) {
        if self.capture {
            self.recorder.capture(grid);
        }
    }

    fn tick_search(&mut self, grid: &mut GridMap) -> TickStatus {
        match self.engine.step() {
            SearchStep::Continuing => {
                // Copy the engine's open/closed sets onto the cells; the
                // engine keeps ownership of its working memory.
                for &pos in self.engine.frontier() {
                    grid.cell_mut(pos).set_search(SearchMark::Frontier);
                }
                for &pos in self.engine.visited() {
                    grid.cell_mut(pos).set_search(SearchMark::Visited);
                }
                self.capture_frame(grid);
                self.phase = Phase::Searching;
                TickStatus::Running
            }
            SearchStep::Done(path) => {
                if path.is_empty() {
                    return self.finish(Outcome::NoPath);
                }
                self.phase = Phase::Revealing { path, next: 0 };
                TickStatus::Running
            }
        }
    }

    fn tick_reveal(&mut self, grid: &mut GridMap, path: Path, next: usize) -> TickStatus {
        grid.cell_mut(path[next]).mark_path();
        self.capture_frame(grid);
        let next = next + 1;
        if next == path.len() {
            return self.finish(Outcome::PathFound);
        }
        self.phase = Phase::Revealing { path, next };
        TickStatus::Running
    }

    /// One sense / classify / plan / move iteration. The plan is never held
    /// across iterations: every move triggers a full replan against the
    /// latest knowledge.
    fn tick_roam(&mut self, grid: &mut GridMap, position: Pos, goal: Pos, radius: i32) -> TickStatus {
        self.occupancy.sense(grid, position, radius);

        let mut marks = self.classify(grid, position, radius);
        let path = self.plan(position, goal);
        debug!(
            "roam iteration at {:?}: {} known obstacles, plan of {} cells",
            position,
            self.occupancy.occupied_count(),
            path.len()
        );

        if path.is_empty() {
            self.apply_marks(grid, &marks);
            return self.finish(Outcome::NoPath);
        }
        if path.len() == 1 {
            self.apply_marks(grid, &marks);
            return self.finish(Outcome::Arrived);
        }

        let next_position = path[1];
        for pos in &path[1..path.len() - 1] {
            let idx = (pos.col + pos.row * grid.cols) as usize;
            marks[idx] = match marks[idx] {
                Diag::Plain | Diag::FieldOfView => Diag::PlannedPath,
                Diag::KnownObstacle => Diag::Collision,
                other => other,
            };
        }
        self.apply_marks(grid, &marks);
        self.capture_frame(grid);

        self.phase = Phase::Roaming {
            position: next_position,
            goal,
            radius,
        };
        TickStatus::Running
    }

    /// Run the engine to completion without step-by-step exposure.
    fn plan(&mut self, from: Pos, goal: Pos) -> Path {
        self.engine.reset();
        self.engine.begin(&self.occupancy, from, goal);
        loop {
            if let SearchStep::Done(path) = self.engine.step() {
                return path;
            }
        }
    }

    fn classify(&self, grid: &GridMap, position: Pos, radius: i32) -> Vec<Diag> {
        let mut marks = Vec::with_capacity((grid.rows * grid.cols) as usize);
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let pos = Pos::new(row, col);
                let cell = grid.cell(pos);
                let mut mark = if cell.endpoint.is_some() {
                    Diag::Endpoint
                } else if pos == position {
                    Diag::CurrentPosition
                } else if cell.obstacle {
                    Diag::UnknownObstacle
                } else if pos.chebyshev(&position) <= radius {
                    Diag::FieldOfView
                } else {
                    Diag::Plain
                };
                // Snapshot knowledge wins over everything but the
                // designations (an endpoint can never be an obstacle).
                if mark != Diag::Endpoint && self.occupancy.is_occupied(pos) {
                    mark = Diag::KnownObstacle;
                }
                marks.push(mark);
            }
        }
        marks
    }

    fn apply_marks(&self, grid: &mut GridMap, marks: &[Diag]) {
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let pos = Pos::new(row, col);
                let idx = (col + row * grid.cols) as usize;
                grid.cell_mut(pos).override_color = marks[idx].color();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::AstarEngine;
    use std::collections::HashSet;

    fn simulator() -> Simulator<AstarEngine> {
        Simulator::new(AstarEngine::new(), FrameRecorder::new(None))
    }

    fn open_grid_3x3() -> GridMap {
        let mut grid = GridMap::new(3, 3, 90, 90);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(2, 2)));
        grid
    }

    fn path_cells(grid: &GridMap) -> HashSet<Pos> {
        let mut cells = HashSet::new();
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                if grid.cell(Pos::new(row, col)).on_path {
                    cells.insert(Pos::new(row, col));
                }
            }
        }
        cells
    }

    #[test]
    fn test_run_without_endpoints_is_rejected() {
        let mut grid = GridMap::new(3, 3, 90, 90);
        grid.place_start(Pos::new(0, 0));
        let mut sim = simulator();
        assert!(sim.start_search_run(&mut grid).is_err());
        assert!(sim.start_roaming_run(&mut grid, 2).is_err());
        assert_eq!(sim.tick(&mut grid), TickStatus::Idle);
    }

    #[test]
    fn test_search_run_finds_and_reveals_path() {
        let mut grid = open_grid_3x3();
        let mut sim = simulator();
        sim.start_search_run(&mut grid).unwrap();
        assert_eq!(sim.drive(&mut grid), Some(Outcome::PathFound));

        // Path cells are marked, endpoints keep their designation instead.
        let on_path = path_cells(&grid);
        assert_eq!(on_path.len(), 3);
        assert!(!grid.cell(Pos::new(0, 0)).on_path);
        assert!(!grid.cell(Pos::new(2, 2)).on_path);
        // The search left visible traces.
        assert!(grid.cell(Pos::new(0, 0)).search.is_some());
    }

    #[test]
    fn test_search_run_reports_unreachable_goal() {
        let mut grid = open_grid_3x3();
        for col in 0..3 {
            assert!(grid.place_obstacle(Pos::new(1, col)));
        }
        let mut sim = simulator();
        sim.start_search_run(&mut grid).unwrap();
        assert_eq!(sim.drive(&mut grid), Some(Outcome::NoPath));
        assert!(path_cells(&grid).is_empty());
    }

    #[test]
    fn test_repeated_search_runs_are_identical() {
        let mut grid = open_grid_3x3();
        assert!(grid.place_obstacle(Pos::new(1, 1)));
        let mut sim = simulator();

        sim.start_search_run(&mut grid).unwrap();
        assert_eq!(sim.drive(&mut grid), Some(Outcome::PathFound));
        let first = path_cells(&grid);

        sim.start_search_run(&mut grid).unwrap();
        assert_eq!(sim.drive(&mut grid), Some(Outcome::PathFound));
        assert_eq!(path_cells(&grid), first);
    }

    #[test]
    fn test_new_run_clears_previous_traces() {
        let mut grid = open_grid_3x3();
        let mut sim = simulator();
        sim.start_search_run(&mut grid).unwrap();
        sim.drive(&mut grid);
        assert!(!path_cells(&grid).is_empty());

        // Starting the next run wipes search marks, path and overrides.
        sim.start_search_run(&mut grid).unwrap();
        assert!(path_cells(&grid).is_empty());
        for row in 0..3 {
            for col in 0..3 {
                assert_eq!(grid.cell(Pos::new(row, col)).search, None);
            }
        }
    }

    #[test]
    fn test_cancel_unwinds_active_run() {
        let mut grid = open_grid_3x3();
        let mut sim = simulator();
        sim.start_search_run(&mut grid).unwrap();
        assert_eq!(sim.tick(&mut grid), TickStatus::Running);

        sim.request_cancel();
        assert_eq!(sim.tick(&mut grid), TickStatus::Finished(Outcome::Cancelled));
        assert!(!sim.is_running());
        assert_eq!(sim.last_outcome(), Some(Outcome::Cancelled));
    }

    #[test]
    fn test_roaming_reaches_goal_and_knowledge_grows_monotonically() {
        let mut grid = GridMap::new(4, 4, 120, 120);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(3, 3)));
        assert!(grid.place_obstacle(Pos::new(0, 1)));
        assert!(grid.place_obstacle(Pos::new(1, 1)));
        assert!(grid.place_obstacle(Pos::new(2, 1)));

        let mut sim = simulator();
        sim.start_roaming_run(&mut grid, 1).unwrap();

        let mut known = 0;
        loop {
            match sim.tick(&mut grid) {
                TickStatus::Running => {
                    let now = sim.occupancy().occupied_count();
                    assert!(now >= known);
                    known = now;
                }
                TickStatus::Finished(outcome) => {
                    assert_eq!(outcome, Outcome::Arrived);
                    break;
                }
                TickStatus::Idle => panic!("run ended without an outcome"),
            }
        }
    }

    #[test]
    fn test_roaming_reports_unreachable_goal() {
        let mut grid = GridMap::new(3, 3, 90, 90);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(2, 2)));
        assert!(grid.place_obstacle(Pos::new(1, 2)));
        assert!(grid.place_obstacle(Pos::new(2, 1)));

        let mut sim = simulator();
        sim.start_roaming_run(&mut grid, 3).unwrap();
        // Radius 3 covers the whole grid: the first plan already knows the
        // goal is walled off.
        assert_eq!(sim.tick(&mut grid), TickStatus::Finished(Outcome::NoPath));
    }

    #[test]
    fn test_roaming_with_blind_radius_walks_onto_obstacle() {
        // Start (0,0), goal (0,2), obstacle between them, sensing radius 0:
        // the first plan cannot know about the obstacle, the agent steps onto
        // it, and only then senses the cell under itself.
        let mut grid = GridMap::new(1, 3, 90, 30);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(0, 2)));
        assert!(grid.place_obstacle(Pos::new(0, 1)));

        let mut sim = simulator();
        sim.start_roaming_run(&mut grid, 0).unwrap();

        // First iteration: the obstacle stays unknown and the plan crosses
        // it without a collision diagnostic.
        assert_eq!(sim.tick(&mut grid), TickStatus::Running);
        assert!(!sim.occupancy().is_occupied(Pos::new(0, 1)));
        assert_eq!(
            grid.cell(Pos::new(0, 1)).override_color,
            Some(palette::UNKNOWN_OBSTACLE)
        );
        assert_eq!(sim.roaming_position(), Some(Pos::new(0, 1)));

        // Second iteration: the agent senses the cell it stands on and moves
        // on to the goal.
        assert_eq!(sim.tick(&mut grid), TickStatus::Running);
        assert!(sim.occupancy().is_occupied(Pos::new(0, 1)));
        assert_eq!(sim.roaming_position(), Some(Pos::new(0, 2)));

        assert_eq!(sim.tick(&mut grid), TickStatus::Finished(Outcome::Arrived));
    }

    #[test]
    fn test_roaming_diagnostics_cover_every_cell() {
        let mut grid = GridMap::new(3, 3, 90, 90);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(2, 2)));
        assert!(grid.place_obstacle(Pos::new(1, 0)));

        let mut sim = simulator();
        sim.start_roaming_run(&mut grid, 1).unwrap();
        assert_eq!(sim.tick(&mut grid), TickStatus::Running);

        // Endpoints carry no override, every other cell got one.
        assert_eq!(grid.cell(Pos::new(0, 0)).override_color, None);
        assert_eq!(grid.cell(Pos::new(2, 2)).override_color, None);
        for row in 0..3 {
            for col in 0..3 {
                let pos = Pos::new(row, col);
                if grid.cell(pos).endpoint.is_none() {
                    assert!(grid.cell(pos).override_color.is_some());
                }
            }
        }

        // The obstacle sits inside the sensing square, so it shows as known.
        assert_eq!(
            grid.cell(Pos::new(1, 0)).override_color,
            Some(palette::OBSTACLE)
        );
        // (2,0) is walled off from every shortest path and out of view.
        assert_eq!(
            grid.cell(Pos::new(2, 0)).override_color,
            Some(palette::DEFAULT)
        );
        // The plan has three interior cells, each either freshly in view or
        // plain before the overlay painted it.
        let planned = (0..3)
            .flat_map(|row| (0..3).map(move |col| Pos::new(row, col)))
            .filter(|&pos| grid.cell(pos).override_color == Some(palette::PATH))
            .count();
        assert_eq!(planned, 3);
        // In-range free cells are either in the field of view or on the path.
        for pos in [Pos::new(0, 1), Pos::new(1, 1)] {
            let color = grid.cell(pos).override_color;
            assert!(
                color == Some(palette::FIELD_OF_VIEW) || color == Some(palette::PATH),
                "unexpected diagnostic at {:?}: {:?}",
                pos,
                color
            );
        }
    }

    #[test]
    fn test_capture_records_frames() {
        let mut grid = open_grid_3x3();
        let mut sim = simulator();
        sim.set_capture(true);
        sim.start_search_run(&mut grid).unwrap();
        sim.drive(&mut grid);
        assert!(sim.recorder().frame_count() > 0);
    }

    /// Engine stub that always answers with a fixed path, regardless of the
    /// occupancy it was given.
    struct ScriptedEngine {
        path: Path,
        empty: HashSet<Pos>,
    }

    impl SearchEngine for ScriptedEngine {
        fn reset(&mut self) {}
        fn begin(&mut self, _occupancy: &Occupancy, _start: Pos, _goal: Pos) {}
        fn step(&mut self) -> SearchStep {
            SearchStep::Done(self.path.clone())
        }
        fn frontier(&self) -> &HashSet<Pos> {
            &self.empty
        }
        fn visited(&self) -> &HashSet<Pos> {
            &self.empty
        }
    }

    #[test]
    fn test_stale_plan_through_known_obstacle_is_flagged_as_collision() {
        // A plan that crosses a cell the agent already knows is occupied can
        // only come from a stale engine answer; the overlay must flag it
        // rather than trust it.
        let mut grid = GridMap::new(1, 3, 90, 30);
        assert!(grid.place_start(Pos::new(0, 0)));
        assert!(grid.place_goal(Pos::new(0, 2)));
        assert!(grid.place_obstacle(Pos::new(0, 1)));

        let engine = ScriptedEngine {
            path: vec![Pos::new(0, 0), Pos::new(0, 1), Pos::new(0, 2)],
            empty: HashSet::new(),
        };
        let mut sim = Simulator::new(engine, FrameRecorder::new(None));
        // Radius 1: the obstacle is sensed before the (scripted) plan.
        sim.start_roaming_run(&mut grid, 1).unwrap();
        assert_eq!(sim.tick(&mut grid), TickStatus::Running);
        assert_eq!(
            grid.cell(Pos::new(0, 1)).override_color,
            Some(palette::COLLISION)
        );
    }
}
