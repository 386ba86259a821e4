pub mod error;
pub mod grid;

pub use error::{Error, Result};
pub use grid::map::{
    Action, BoundaryPolicy, CellKind, Coordinate, GridConfig, ObstaclePolicy, Transition,
    OFF_GRID_PENALTY,
};
pub use grid::render::{render_grid, render_progress, render_status};
pub use grid::world::GridWorld;

pub use crossterm;
pub use ratatui;
