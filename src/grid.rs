use crate::cell::{Cell, Endpoint};

/// A position on the grid, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub fn new(row: i32, col: i32) -> Self {
        Pos { row, col }
    }

    /// 4-directional step distance.
    pub fn manhattan(&self, other: &Pos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    /// max(|Δrow|, |Δcol|) - the square sensing neighborhood metric.
    pub fn chebyshev(&self, other: &Pos) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }
}

/// What a click on the map did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    PlacedStart(Pos),
    PlacedGoal(Pos),
    PlacedObstacle(Pos),
    Erased(Pos),
    /// The placement broke a rule (obstacle on start/goal or the reverse);
    /// nothing changed. The caller reports this to the user.
    Rejected(Pos),
}

/// The interactive cell field.
///
/// Cells are stored in a flat row-major `Vec`. Start and goal designations
/// are tracked both here and in the cells themselves; all mutation goes
/// through the `place_*`/`erase` operations so the two never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    pub rows: i32,
    pub cols: i32,
    cell_px: i32,
    cells: Vec<Cell>,
    start: Option<Pos>,
    goal: Option<Pos>,
}

impl GridMap {
    /// Create an empty grid sized so `cols x rows` cells fit a
    /// `win_w x win_h` pixel window.
    pub fn new(rows: i32, cols: i32, win_w: i32, win_h: i32) -> Self {
        assert!(rows > 0 && cols > 0, "grid dimensions must be positive");
        let cell_px = (win_w / cols).min(win_h / rows).max(1);
        GridMap {
            rows,
            cols,
            cell_px,
            cells: vec![Cell::default(); (rows * cols) as usize],
            start: None,
            goal: None,
        }
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    fn index(&self, pos: Pos) -> usize {
        (pos.col + pos.row * self.cols) as usize
    }

    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        let idx = self.index(pos);
        &mut self.cells[idx]
    }

    /// Side length of one cell in pixels.
    pub fn cell_px(&self) -> i32 {
        self.cell_px
    }

    /// Width of the drawn grid in pixels.
    pub fn width_px(&self) -> i32 {
        self.cell_px * self.cols
    }

    /// Height of the drawn grid in pixels.
    pub fn height_px(&self) -> i32 {
        self.cell_px * self.rows
    }

    pub fn start(&self) -> Option<Pos> {
        self.start
    }

    pub fn goal(&self) -> Option<Pos> {
        self.goal
    }

    /// Designate the start cell. Fails if a start already exists or the cell
    /// refuses the designation.
    pub fn place_start(&mut self, pos: Pos) -> bool {
        if self.start.is_some() || !self.in_bounds(pos) {
            return false;
        }
        if self.cell_mut(pos).set_endpoint(Endpoint::Start) {
            self.start = Some(pos);
            return true;
        }
        false
    }

    /// Designate the goal cell. Same rules as `place_start`.
    pub fn place_goal(&mut self, pos: Pos) -> bool {
        if self.goal.is_some() || !self.in_bounds(pos) {
            return false;
        }
        if self.cell_mut(pos).set_endpoint(Endpoint::Goal) {
            self.goal = Some(pos);
            return true;
        }
        false
    }

    /// Mark an obstacle. Fails on start/goal cells.
    pub fn place_obstacle(&mut self, pos: Pos) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.cell_mut(pos).set_obstacle()
    }

    /// Clear a single cell, dropping a matching start/goal designation.
    pub fn erase(&mut self, pos: Pos) {
        if !self.in_bounds(pos) {
            return;
        }
        if self.start == Some(pos) {
            self.start = None;
        }
        if self.goal == Some(pos) {
            self.goal = None;
        }
        self.cell_mut(pos).reset();
    }

    /// Map a pixel position to a cell and apply a click to it.
    ///
    /// Left clicks place, in order: start if unset, then goal if unset, then
    /// obstacles. Erase clicks clear the cell. Clicks outside the drawn grid
    /// return `None`.
    pub fn handle_click(&mut self, px: f32, py: f32, erase: bool) -> Option<ClickOutcome> {
        if px < 0.0 || px >= self.width_px() as f32 || py < 0.0 || py >= self.height_px() as f32 {
            return None;
        }
        let pos = Pos::new(py as i32 / self.cell_px, px as i32 / self.cell_px);

        if erase {
            self.erase(pos);
            return Some(ClickOutcome::Erased(pos));
        }
        let outcome = if self.start.is_none() {
            if self.place_start(pos) {
                ClickOutcome::PlacedStart(pos)
            } else {
                ClickOutcome::Rejected(pos)
            }
        } else if self.goal.is_none() {
            if self.place_goal(pos) {
                ClickOutcome::PlacedGoal(pos)
            } else {
                ClickOutcome::Rejected(pos)
            }
        } else if self.place_obstacle(pos) {
            ClickOutcome::PlacedObstacle(pos)
        } else {
            ClickOutcome::Rejected(pos)
        };
        Some(outcome)
    }

    /// Clear every cell and both designations back to the freshly-constructed
    /// state.
    pub fn reset(&mut self) {
        self.start = None;
        self.goal = None;
        for cell in &mut self.cells {
            cell.reset();
        }
    }

    /// Drop run-transient state (search marks, path, overrides) on every cell.
    pub fn clear_run_state(&mut self) {
        for cell in &mut self.cells {
            cell.clear_run_state();
        }
    }

    /// Render the layout as text rows for clipboard exchange:
    /// `s` start, `g` goal, `■` obstacle, `□` free.
    pub fn layout_string(&self) -> String {
        let mut out = String::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = self.cell(Pos::new(row, col));
                out.push(match cell.endpoint {
                    Some(Endpoint::Start) => 's',
                    Some(Endpoint::Goal) => 'g',
                    None if cell.obstacle => '■',
                    None => '□',
                });
            }
            out.push('\n');
        }
        out
    }

    /// Replace the layout with one parsed from `layout_string` text.
    ///
    /// The text must match this grid's dimensions and contain at most one
    /// start and one goal. On failure the grid is left untouched.
    pub fn apply_layout(&mut self, text: &str) -> Result<(), String> {
        let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
        if lines.len() != self.rows as usize {
            return Err(format!("expected {} rows, got {}", self.rows, lines.len()));
        }

        let mut cells = vec![Cell::default(); (self.rows * self.cols) as usize];
        let mut start = None;
        let mut goal = None;
        for (row, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() != self.cols as usize {
                return Err(format!(
                    "row {} has {} cells, expected {}",
                    row,
                    chars.len(),
                    self.cols
                ));
            }
            for (col, ch) in chars.iter().enumerate() {
                let pos = Pos::new(row as i32, col as i32);
                let cell = &mut cells[(pos.col + pos.row * self.cols) as usize];
                match ch {
                    's' => {
                        if start.is_some() {
                            return Err("more than one start cell".to_string());
                        }
                        cell.endpoint = Some(Endpoint::Start);
                        start = Some(pos);
                    }
                    'g' => {
                        if goal.is_some() {
                            return Err("more than one goal cell".to_string());
                        }
                        cell.endpoint = Some(Endpoint::Goal);
                        goal = Some(pos);
                    }
                    '■' => cell.obstacle = true,
                    '□' => {}
                    other => return Err(format!("unknown cell character {:?}", other)),
                }
            }
        }

        self.cells = cells;
        self.start = start;
        self.goal = goal;
        Ok(())
    }
}
