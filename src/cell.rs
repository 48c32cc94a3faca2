use crate::palette::{self, Rgb};

/// Role of a designated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Goal,
}

/// Membership in the search tree of an active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMark {
    /// Queued for expansion (open set).
    Frontier,
    /// Already expanded (closed set).
    Visited,
}

/// Logical state of a single grid cell.
///
/// Placement operations report success as a `bool`; a failed operation never
/// mutates the cell. Obstacle and endpoint are mutually exclusive under every
/// call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub obstacle: bool,
    pub endpoint: Option<Endpoint>,
    pub search: Option<SearchMark>,
    pub on_path: bool,
    /// When set, drawn instead of any derived color.
    pub override_color: Option<Rgb>,
}

impl Cell {
    /// Mark the cell as an obstacle. Fails on start/goal cells.
    pub fn set_obstacle(&mut self) -> bool {
        if self.endpoint.is_some() {
            return false;
        }
        self.obstacle = true;
        true
    }

    /// Designate the cell as start or goal. Fails on obstacles and on cells
    /// that already carry a designation.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) -> bool {
        if self.obstacle || self.endpoint.is_some() {
            return false;
        }
        self.endpoint = Some(endpoint);
        true
    }

    /// Record search-tree membership. Unconditional.
    pub fn set_search(&mut self, mark: SearchMark) {
        self.search = Some(mark);
    }

    /// Mark the cell as part of the final path. Silently skips start/goal
    /// cells so they keep their designation color.
    pub fn mark_path(&mut self) {
        if self.endpoint.is_none() {
            self.on_path = true;
        }
    }

    /// Restore the freshly-constructed state.
    pub fn reset(&mut self) {
        *self = Cell::default();
    }

    /// Drop everything a search run wrote: search marks, path membership and
    /// diagnostic overrides. Obstacles and designations stay.
    pub fn clear_run_state(&mut self) {
        self.search = None;
        self.on_path = false;
        self.override_color = None;
    }

    /// The color this cell should be drawn with.
    ///
    /// Precedence, lowest to highest: default, obstacle, visited/frontier,
    /// path, endpoint, explicit override.
    pub fn display_color(&self) -> Rgb {
        if let Some(color) = self.override_color {
            return color;
        }
        match self.endpoint {
            Some(Endpoint::Start) => return palette::START,
            Some(Endpoint::Goal) => return palette::GOAL,
            None => {}
        }
        if self.on_path {
            return palette::PATH;
        }
        match self.search {
            Some(SearchMark::Frontier) => return palette::FRONTIER,
            Some(SearchMark::Visited) => return palette::VISITED,
            None => {}
        }
        if self.obstacle {
            palette::OBSTACLE
        } else {
            palette::DEFAULT
        }
    }
}
