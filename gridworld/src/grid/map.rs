// map.rs
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Substitute for `max_a' Q(s', a')` when `s'` lies off the grid.
pub const OFF_GRID_PENALTY: f64 = -0.99;

/// A cell identifier. Signed so a rollout can describe the cell it walked off to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: i32,
    pub col: i32,
}

impl Coordinate {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The cell one unit step away in the direction of `action`, unchecked.
    pub fn offset(self, action: Action) -> Coordinate {
        let (dr, dc) = action.delta();
        Coordinate {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    pub fn manhattan(self, other: Coordinate) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four cardinal moves. The discriminant is the table / network output index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    pub const COUNT: usize = 4;
    pub const ALL: [Action; Action::COUNT] = [Action::Up, Action::Right, Action::Down, Action::Left];

    pub fn index(self) -> usize {
        self as usize
    }

    /// (row delta, col delta)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Action::Up => (-1, 0),
            Action::Right => (0, 1),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        Action::ALL
            .get(index)
            .copied()
            .ok_or(Error::InvalidAction(index))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Open,
    Obstacle,
    Win,
    Lose,
    OutOfBounds,
}

/// What happens to a move that would leave the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Snap back onto the nearest edge cell.
    Clamp,
    /// Refuse the move; the agent stays where it was.
    #[default]
    Reject,
}

/// What happens to a move into an obstacle. The agent never enters the obstacle
/// under either policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstaclePolicy {
    /// Stay put, reward 0, and the learner leaves its table alone.
    #[default]
    NoOp,
    /// Stay put and receive this (normally negative) reward.
    Penalize(f64),
}

/// Outcome of applying one action to one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub from: Coordinate,
    pub action: Action,
    /// The raw destination, before boundary or obstacle handling.
    pub attempted: Coordinate,
    /// Classification of `attempted`.
    pub hit: CellKind,
    /// Where the agent actually is after the move.
    pub next: Coordinate,
    pub reward: f64,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(self.hit, CellKind::Win | CellKind::Lose)
    }

    pub fn is_win(&self) -> bool {
        self.hit == CellKind::Win
    }

    pub fn left_grid(&self) -> bool {
        self.hit == CellKind::OutOfBounds
    }
}

/// Immutable description of the square world: bounds, obstacles and the special cells.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    size: usize,
    obstacles: BTreeSet<Coordinate>,
    start: Coordinate,
    goal: Coordinate,
    failure_cell: Coordinate,
    boundary: BoundaryPolicy,
    obstacle_policy: ObstaclePolicy,
}

impl GridConfig {
    pub fn new(
        size: usize,
        obstacles: impl IntoIterator<Item = Coordinate>,
        start: Coordinate,
        goal: Coordinate,
        failure_cell: Coordinate,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::config("grid size must be positive"));
        }
        if i32::try_from(size).is_err() {
            return Err(Error::config(format!("grid size {size} is too large")));
        }

        let grid = GridConfig {
            size,
            obstacles: obstacles.into_iter().collect(),
            start,
            goal,
            failure_cell,
            boundary: BoundaryPolicy::default(),
            obstacle_policy: ObstaclePolicy::default(),
        };

        for (name, cell) in [("start", start), ("goal", goal), ("failure cell", failure_cell)] {
            if !grid.contains(cell) {
                return Err(Error::config(format!("{name} {cell} lies outside a {size}x{size} grid")));
            }
        }
        if let Some(cell) = grid.obstacles.iter().find(|&&c| !grid.contains(c)) {
            return Err(Error::config(format!("obstacle {cell} lies outside a {size}x{size} grid")));
        }
        if goal == failure_cell {
            return Err(Error::config(format!("goal and failure cell are both {goal}")));
        }
        if grid.obstacles.contains(&start) {
            return Err(Error::config(format!("start {start} is an obstacle")));
        }
        if grid.obstacles.contains(&goal) {
            return Err(Error::config(format!("goal {goal} is an obstacle")));
        }

        Ok(grid)
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_obstacle_policy(mut self, policy: ObstaclePolicy) -> Self {
        self.obstacle_policy = policy;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    pub fn start(&self) -> Coordinate {
        self.start
    }

    pub fn goal(&self) -> Coordinate {
        self.goal
    }

    pub fn failure_cell(&self) -> Coordinate {
        self.failure_cell
    }

    pub fn obstacles(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.obstacles.iter().copied()
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    pub fn obstacle_policy(&self) -> ObstaclePolicy {
        self.obstacle_policy
    }

    pub fn contains(&self, cell: Coordinate) -> bool {
        let size = self.size as i32;
        (0..size).contains(&cell.row) && (0..size).contains(&cell.col)
    }

    /// Row-major index of an in-bounds cell.
    pub fn index_of(&self, cell: Coordinate) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.row as usize * self.size + cell.col as usize)
    }

    /// Every in-bounds cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Coordinate> + '_ {
        let size = self.size as i32;
        (0..size).flat_map(move |row| (0..size).map(move |col| Coordinate { row, col }))
    }

    pub fn classify(&self, cell: Coordinate) -> CellKind {
        if !self.contains(cell) {
            CellKind::OutOfBounds
        } else if cell == self.goal {
            CellKind::Win
        } else if cell == self.failure_cell {
            CellKind::Lose
        } else if self.obstacles.contains(&cell) {
            CellKind::Obstacle
        } else {
            CellKind::Open
        }
    }

    /// Reward for a move whose raw destination classified as `hit`.
    pub fn reward(&self, hit: CellKind) -> f64 {
        match hit {
            CellKind::Win => 1.0,
            CellKind::Lose => -1.0,
            CellKind::Obstacle => match self.obstacle_policy {
                ObstaclePolicy::NoOp => 0.0,
                ObstaclePolicy::Penalize(penalty) => penalty,
            },
            CellKind::Open | CellKind::OutOfBounds => 0.0,
        }
    }

    fn clamp(&self, cell: Coordinate) -> Coordinate {
        let max = self.size as i32 - 1;
        Coordinate {
            row: cell.row.clamp(0, max),
            col: cell.col.clamp(0, max),
        }
    }

    /// Pure transition function.
    pub fn step(&self, from: Coordinate, action: Action) -> Transition {
        let attempted = from.offset(action);
        let hit = self.classify(attempted);
        let next = match hit {
            CellKind::OutOfBounds => match self.boundary {
                BoundaryPolicy::Clamp => self.clamp(attempted),
                BoundaryPolicy::Reject => from,
            },
            CellKind::Obstacle => from,
            CellKind::Open | CellKind::Win | CellKind::Lose => attempted,
        };

        Transition {
            from,
            action,
            attempted,
            hit,
            next,
            reward: self.reward(hit),
        }
    }
}
