use env::Env;

use super::map::{Action, CellKind, Coordinate, GridConfig, Transition};

/// A single agent walking a [`GridConfig`]. Holds the per-episode trace:
/// current cell, steps taken and the last transition.
#[derive(Clone, Debug)]
pub struct GridWorld {
    grid: GridConfig,
    position: Coordinate,
    steps: usize,
    last: Option<Transition>,
}

impl GridWorld {
    pub fn new(grid: GridConfig) -> Self {
        GridWorld {
            position: grid.start(),
            grid,
            steps: 0,
            last: None,
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.last.as_ref()
    }

    fn status(&self) -> CellKind {
        self.grid.classify(self.position)
    }
}

impl Env for GridWorld {
    type State = Coordinate;
    type Action = Action;
    type Status = Transition;

    fn reset(&mut self) -> Self::State {
        self.position = self.grid.start();
        self.steps = 0;
        self.last = None;
        self.position
    }

    fn step(&mut self, action: Action) -> (Self::State, Self::Status) {
        let transition = self.grid.step(self.position, action);
        self.position = transition.next;
        self.steps += 1;
        self.last = Some(transition);
        (self.position, transition)
    }

    fn current_state(&self) -> Self::State {
        self.position
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn is_terminal(&self) -> bool {
        matches!(self.status(), CellKind::Win | CellKind::Lose)
    }

    fn is_win(&self) -> bool {
        self.status() == CellKind::Win
    }
}
