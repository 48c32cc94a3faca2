use crate::grid::Pos;
use crate::occupancy::Occupancy;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Ordered coordinates from start to goal inclusive; empty means unreachable.
pub type Path = Vec<Pos>;

/// Result of one unit of search work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    Continuing,
    Done(Path),
}

/// A resumable shortest-path computation the simulation driver can plug in.
///
/// The engine reads obstacle state only through the occupancy snapshot handed
/// to `begin`; it never sees the grid itself. `step` performs one discrete
/// unit of work and returns control to the caller; while a run is active,
/// `frontier` and `visited` expose the current open/closed coordinate sets
/// read-only, for the caller to copy. Single-threaded, no reentrancy.
pub trait SearchEngine {
    /// Discard all state from a previous run.
    fn reset(&mut self);

    /// Snapshot the occupancy and initialize a run from `start` to `goal`.
    fn begin(&mut self, occupancy: &Occupancy, start: Pos, goal: Pos);

    /// Advance by one unit of work. After completion (or before `begin`)
    /// this keeps returning `Done` with an empty path.
    fn step(&mut self) -> SearchStep;

    /// Coordinates currently queued for expansion.
    fn frontier(&self) -> &HashSet<Pos>;

    /// Coordinates already expanded.
    fn visited(&self) -> &HashSet<Pos>;
}

/// Queue entry ordered for a deterministic min-heap on f-score.
#[derive(Debug, Clone, Copy)]
struct Node {
    f: i32,
    g: i32,
    pos: Pos,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.pos == other.pos
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default),
        // position as tie-breaker for deterministic expansion order.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.pos.row.cmp(&self.pos.row))
            .then_with(|| other.pos.col.cmp(&self.pos.col))
    }
}

const NEIGHBOR_STEPS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 4-directional A* with a Manhattan heuristic, one node expansion per step.
///
/// The start cell is expanded regardless of its own occupancy (an agent can
/// find itself standing on an obstacle it had not sensed yet); only neighbor
/// admission checks the snapshot.
pub struct AstarEngine {
    snapshot: Occupancy,
    goal: Pos,
    heap: BinaryHeap<Node>,
    frontier: HashSet<Pos>,
    visited: HashSet<Pos>,
    came_from: HashMap<Pos, Pos>,
    g_score: HashMap<Pos, i32>,
    running: bool,
    expansions: u64,
}

impl AstarEngine {
    pub fn new() -> Self {
        AstarEngine {
            snapshot: Occupancy::new(0, 0),
            goal: Pos::new(0, 0),
            heap: BinaryHeap::new(),
            frontier: HashSet::new(),
            visited: HashSet::new(),
            came_from: HashMap::new(),
            g_score: HashMap::new(),
            running: false,
            expansions: 0,
        }
    }

    fn reconstruct(&self, goal: Pos) -> Path {
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(&previous) = self.came_from.get(&current) {
            path.push(previous);
            current = previous;
        }
        path.reverse();
        path
    }
}

impl Default for AstarEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine for AstarEngine {
    fn reset(&mut self) {
        self.heap.clear();
        self.frontier.clear();
        self.visited.clear();
        self.came_from.clear();
        self.g_score.clear();
        self.running = false;
        self.expansions = 0;
    }

    fn begin(&mut self, occupancy: &Occupancy, start: Pos, goal: Pos) {
        self.reset();
        self.snapshot = occupancy.clone();
        self.goal = goal;
        self.g_score.insert(start, 0);
        self.heap.push(Node {
            f: start.manhattan(&goal),
            g: 0,
            pos: start,
        });
        self.frontier.insert(start);
        self.running = true;
    }

    fn step(&mut self) -> SearchStep {
        if !self.running {
            return SearchStep::Done(Vec::new());
        }

        // Pop until a non-stale entry; one real expansion per step.
        let node = loop {
            match self.heap.pop() {
                Some(node) => {
                    if self.g_score.get(&node.pos) == Some(&node.g) && !self.visited.contains(&node.pos) {
                        break node;
                    }
                }
                None => {
                    self.running = false;
                    debug!("search exhausted after {} expansions, goal unreachable", self.expansions);
                    return SearchStep::Done(Vec::new());
                }
            }
        };

        self.expansions += 1;
        self.frontier.remove(&node.pos);
        self.visited.insert(node.pos);

        if node.pos == self.goal {
            self.running = false;
            let path = self.reconstruct(node.pos);
            debug!(
                "path of {} cells found after {} expansions",
                path.len(),
                self.expansions
            );
            return SearchStep::Done(path);
        }

        for (d_row, d_col) in NEIGHBOR_STEPS {
            let next = Pos::new(node.pos.row + d_row, node.pos.col + d_col);
            if self.snapshot.is_occupied(next) || self.visited.contains(&next) {
                continue;
            }
            let tentative = node.g + 1;
            let better = match self.g_score.get(&next) {
                Some(&known) => tentative < known,
                None => true,
            };
            if better {
                self.g_score.insert(next, tentative);
                self.came_from.insert(next, node.pos);
                self.heap.push(Node {
                    f: tentative + next.manhattan(&self.goal),
                    g: tentative,
                    pos: next,
                });
                self.frontier.insert(next);
            }
        }

        SearchStep::Continuing
    }

    fn frontier(&self) -> &HashSet<Pos> {
        &self.frontier
    }

    fn visited(&self) -> &HashSet<Pos> {
        &self.visited
    }
}
