use std::collections::HashSet;

use gridworld::{Action, CellKind, Coordinate, GridConfig};
use serde::Serialize;

use super::q_utils::argmax_first;
use crate::error::Result;

/// Anything that can score the four actions of a cell.
pub trait QFunction {
    fn action_values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]>;

    fn greedy_action(&self, cell: Coordinate) -> Result<Action> {
        let values = self.action_values(cell)?;
        Ok(Action::ALL[argmax_first(&values)])
    }
}

/// Why a greedy rollout stopped short of the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// The greedy action walked off the grid.
    OutOfBounds,
    /// A cell already on the path came up again.
    Cycle,
    StepBudget,
    /// Walked into the failure cell.
    Lost,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathResult {
    /// Visited cells, starting with the start cell.
    pub path: Vec<Coordinate>,
    pub complete: bool,
    pub divergence: Option<Divergence>,
}

impl PathResult {
    fn finished(path: Vec<Coordinate>) -> Self {
        PathResult {
            path,
            complete: true,
            divergence: None,
        }
    }

    fn diverged(path: Vec<Coordinate>, divergence: Divergence) -> Self {
        PathResult {
            path,
            complete: false,
            divergence: Some(divergence),
        }
    }

    pub fn moves(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.path.last().copied()
    }
}

/// Greedy rollout from the start cell.
///
/// Moves use the raw action deltas whatever the grid's boundary policy, so
/// leaving the grid shows up as [`Divergence::OutOfBounds`] with the off-grid
/// cell as the last entry of the path. Bumping an obstacle keeps the agent in
/// place, which the deterministic policy would repeat forever, so it is
/// reported as a [`Divergence::Cycle`].
pub fn extract_path<Q: QFunction + ?Sized>(q: &Q, grid: &GridConfig, max_steps: usize) -> Result<PathResult> {
    let mut current = grid.start();
    let mut path = vec![current];
    let mut visited = HashSet::from([current]);

    loop {
        match grid.classify(current) {
            CellKind::Win => return Ok(PathResult::finished(path)),
            CellKind::OutOfBounds => return Ok(PathResult::diverged(path, Divergence::OutOfBounds)),
            CellKind::Lose => return Ok(PathResult::diverged(path, Divergence::Lost)),
            CellKind::Open | CellKind::Obstacle => {}
        }
        if path.len() > max_steps {
            return Ok(PathResult::diverged(path, Divergence::StepBudget));
        }

        let action = q.greedy_action(current)?;
        let mut next = current.offset(action);
        if grid.classify(next) == CellKind::Obstacle {
            next = current;
        }
        if !visited.insert(next) {
            return Ok(PathResult::diverged(path, Divergence::Cycle));
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::q_learning::ValueTable;

    fn grid(obstacles: &[Coordinate]) -> GridConfig {
        GridConfig::new(
            4,
            obstacles.iter().copied(),
            Coordinate::new(3, 0),
            Coordinate::new(0, 3),
            Coordinate::new(3, 3),
        )
        .unwrap()
    }

    fn c(row: i32, col: i32) -> Coordinate {
        Coordinate::new(row, col)
    }

    fn prefer(table: &mut ValueTable, cell: Coordinate, action: Action) {
        let mut values = [0.0; Action::COUNT];
        values[action.index()] = 1.0;
        table.set_action_values(cell, values).unwrap();
    }

    #[test]
    fn untrained_table_walks_up_and_off_the_grid() {
        let table = ValueTable::new(4);
        let result = extract_path(&table, &grid(&[]), 16).unwrap();
        assert_eq!(result.path, vec![c(3, 0), c(2, 0), c(1, 0), c(0, 0), c(-1, 0)]);
        assert!(!result.complete);
        assert_eq!(result.divergence, Some(Divergence::OutOfBounds));
        assert_eq!(result.moves(), 4);
    }

    #[test]
    fn follows_the_greedy_actions_to_the_goal() {
        let mut table = ValueTable::new(4);
        for row in 1..4 {
            prefer(&mut table, c(row, 0), Action::Up);
        }
        for col in 0..3 {
            prefer(&mut table, c(0, col), Action::Right);
        }
        let result = extract_path(&table, &grid(&[]), 16).unwrap();
        assert!(result.complete);
        assert_eq!(result.divergence, None);
        assert_eq!(result.moves(), 6);
        assert_eq!(result.end(), Some(c(0, 3)));
    }

    #[test]
    fn ping_pong_is_a_cycle() {
        let mut table = ValueTable::new(4);
        prefer(&mut table, c(3, 0), Action::Right);
        prefer(&mut table, c(3, 1), Action::Left);
        let result = extract_path(&table, &grid(&[]), 16).unwrap();
        assert_eq!(result.path, vec![c(3, 0), c(3, 1)]);
        assert_eq!(result.divergence, Some(Divergence::Cycle));
    }

    #[test]
    fn bumping_an_obstacle_stops_the_rollout() {
        let table = ValueTable::new(4);
        let result = extract_path(&table, &grid(&[c(2, 0)]), 16).unwrap();
        assert_eq!(result.path, vec![c(3, 0)]);
        assert_eq!(result.divergence, Some(Divergence::Cycle));
    }

    #[test]
    fn walking_into_the_failure_cell_is_lost() {
        let mut table = ValueTable::new(4);
        for col in 0..3 {
            prefer(&mut table, c(3, col), Action::Right);
        }
        let result = extract_path(&table, &grid(&[]), 16).unwrap();
        assert_eq!(result.end(), Some(c(3, 3)));
        assert_eq!(result.divergence, Some(Divergence::Lost));
    }

    #[test]
    fn step_budget_bounds_the_rollout() {
        let table = ValueTable::new(4);
        let result = extract_path(&table, &grid(&[]), 2).unwrap();
        assert_eq!(result.path, vec![c(3, 0), c(2, 0), c(1, 0)]);
        assert_eq!(result.divergence, Some(Divergence::StepBudget));

        let result = extract_path(&table, &grid(&[]), 0).unwrap();
        assert_eq!(result.path, vec![c(3, 0)]);
        assert_eq!(result.divergence, Some(Divergence::StepBudget));
    }
}
