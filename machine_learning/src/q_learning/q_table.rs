use gridworld::{Action, Coordinate, GridConfig};
use serde::Serialize;

use super::path::QFunction;
use super::q_utils::{argmax_first, max_q};
use crate::error::{Error, Result};

/// Action-values for every cell of a square grid.
///
/// Stored flat, indexed by `(row, col, action)`, so each cell owns its own four
/// entries. All entries start at 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTable {
    size: usize,
    values: Vec<f64>,
}

impl ValueTable {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size * Action::COUNT],
        }
    }

    /// Snapshot of any action-value function over every cell of `grid`.
    pub fn evaluate<Q: QFunction + ?Sized>(grid: &GridConfig, q: &Q) -> Result<Self> {
        let mut table = ValueTable::new(grid.size());
        for cell in grid.cells() {
            let values = q.action_values(cell)?;
            table.set_action_values(cell, values)?;
        }
        Ok(table)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn offset(&self, cell: Coordinate) -> Option<usize> {
        let size = self.size as i32;
        ((0..size).contains(&cell.row) && (0..size).contains(&cell.col))
            .then(|| (cell.row as usize * self.size + cell.col as usize) * Action::COUNT)
    }

    pub fn get(&self, cell: Coordinate, action: Action) -> Option<f64> {
        self.offset(cell).map(|base| self.values[base + action.index()])
    }

    pub fn set(&mut self, cell: Coordinate, action: Action, value: f64) -> Result<()> {
        let base = self.offset(cell).ok_or(Error::CellOutOfBounds(cell))?;
        self.values[base + action.index()] = value;
        Ok(())
    }

    pub fn action_values(&self, cell: Coordinate) -> Option<[f64; Action::COUNT]> {
        self.offset(cell).map(|base| {
            let mut out = [0.0; Action::COUNT];
            out.copy_from_slice(&self.values[base..base + Action::COUNT]);
            out
        })
    }

    pub fn set_action_values(&mut self, cell: Coordinate, values: [f64; Action::COUNT]) -> Result<()> {
        let base = self.offset(cell).ok_or(Error::CellOutOfBounds(cell))?;
        self.values[base..base + Action::COUNT].copy_from_slice(&values);
        Ok(())
    }

    /// `max_a Q(cell, a)`
    pub fn max_value(&self, cell: Coordinate) -> Option<f64> {
        self.action_values(cell).map(|values| max_q(&values))
    }

    /// First action achieving the maximum, so all-equal cells pick `Up`.
    pub fn greedy_action(&self, cell: Coordinate) -> Option<Action> {
        self.action_values(cell)
            .map(|values| Action::ALL[argmax_first(&values)])
    }

    /// `(cell, [up, right, down, left])` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &[f64])> + '_ {
        let size = self.size;
        self.values
            .chunks_exact(Action::COUNT)
            .enumerate()
            .map(move |(idx, values)| {
                let cell = Coordinate::new((idx / size) as i32, (idx % size) as i32);
                (cell, values)
            })
    }
}

impl QFunction for ValueTable {
    fn action_values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]> {
        ValueTable::action_values(self, cell).ok_or(Error::CellOutOfBounds(cell))
    }
}
