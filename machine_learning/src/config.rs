//! Learner configuration
//!
//! Everything a learner needs is carried in one immutable [`LearnerConfig`].
//! Missing JSON fields fall back to the defaults of the 4x4 demo grid.

use std::fs;
use std::path::Path;

use env::rand::{self, SeedableRng};
use gridworld::{BoundaryPolicy, Coordinate, GridConfig, ObstaclePolicy};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which learner a [`LearnerConfig`] builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerKind {
    /// Value table updated with the Bellman equation.
    #[default]
    Tabular,
    /// Hand-rolled sigmoid network standing in for the value table.
    Neural,
    /// Candle dense network trained online (ReLU, Adam, MSE).
    Deep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub grid_size: usize,
    pub obstacles: Vec<Coordinate>,
    /// Defaults to the bottom-left cell.
    pub start: Option<Coordinate>,
    /// Defaults to the top-right cell.
    pub goal: Option<Coordinate>,
    /// Defaults to the bottom-right cell.
    pub failure_cell: Option<Coordinate>,
    /// Learning rate α of the Bellman update.
    pub alpha: f64,
    /// γ
    pub discount_factor: f64,
    pub epsilon: f64,
    pub boundary: BoundaryPolicy,
    pub obstacle_policy: ObstaclePolicy,
    /// Iteration cap for one training episode.
    pub max_episode_steps: usize,
    /// Greedy rollouts get `multiplier * size^2` steps.
    pub rollout_step_multiplier: usize,
    /// Total episodes a learner will ever train; `None` is unbounded.
    pub episode_limit: Option<usize>,
    pub seed: Option<u64>,
    pub learner: LearnerKind,
    /// Hidden layer width of the neural learner.
    pub hidden_size: usize,
    /// Gradient step of the neural learner.
    pub learning_rate: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            obstacles: Vec::new(),
            start: None,
            goal: None,
            failure_cell: None,
            alpha: 0.1,
            discount_factor: 0.9,
            epsilon: 0.15,
            boundary: BoundaryPolicy::default(),
            obstacle_policy: ObstaclePolicy::default(),
            max_episode_steps: 10_000,
            rollout_step_multiplier: 1,
            episode_limit: None,
            seed: None,
            learner: LearnerKind::default(),
            hidden_size: 16,
            learning_rate: 0.1,
        }
    }
}

impl LearnerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LearnerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read config {}", path.display()),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Saturates for sizes past `i32::MAX`; `validate` rejects those.
    fn last_index(&self) -> i32 {
        i32::try_from(self.grid_size)
            .unwrap_or(i32::MAX)
            .saturating_sub(1)
    }

    pub fn start(&self) -> Coordinate {
        self.start
            .unwrap_or(Coordinate::new(self.last_index(), 0))
    }

    pub fn goal(&self) -> Coordinate {
        self.goal.unwrap_or(Coordinate::new(0, self.last_index()))
    }

    pub fn failure_cell(&self) -> Coordinate {
        self.failure_cell
            .unwrap_or(Coordinate::new(self.last_index(), self.last_index()))
    }

    pub fn max_rollout_steps(&self) -> usize {
        self.checked_rollout_steps().unwrap_or(usize::MAX)
    }

    fn checked_rollout_steps(&self) -> Option<usize> {
        self.rollout_step_multiplier
            .checked_mul(self.grid_size)?
            .checked_mul(self.grid_size)
    }

    pub fn validate(&self) -> Result<()> {
        if i32::try_from(self.grid_size).is_err() {
            return Err(Error::config(format!("grid size {} is too large", self.grid_size)));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::config(format!("alpha {} must be in (0, 1]", self.alpha)));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(Error::config(format!(
                "discount factor {} must be in [0, 1]",
                self.discount_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::config(format!("epsilon {} must be in [0, 1]", self.epsilon)));
        }
        if self.max_episode_steps == 0 {
            return Err(Error::config("max_episode_steps must be positive"));
        }
        if self.rollout_step_multiplier == 0 {
            return Err(Error::config("rollout_step_multiplier must be positive"));
        }
        if self.checked_rollout_steps().is_none() {
            return Err(Error::config(format!(
                "rollout budget {} * {}^2 overflows",
                self.rollout_step_multiplier, self.grid_size
            )));
        }
        if self.hidden_size == 0 {
            return Err(Error::config("hidden_size must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config(format!(
                "learning rate {} must be positive",
                self.learning_rate
            )));
        }
        self.build_grid().map(|_| ())
    }

    fn build_grid(&self) -> Result<GridConfig> {
        let grid = GridConfig::new(
            self.grid_size,
            self.obstacles.iter().copied(),
            self.start(),
            self.goal(),
            self.failure_cell(),
        )?;
        Ok(grid
            .with_boundary(self.boundary)
            .with_obstacle_policy(self.obstacle_policy))
    }

    /// Validates the whole config and returns the grid it describes.
    pub fn grid_config(&self) -> Result<GridConfig> {
        self.validate()?;
        self.build_grid()
    }

    /// Fresh RNG for a learner: seeded when `seed` is set, otherwise drawn from the thread RNG.
    pub fn rng(&self) -> ChaCha12Rng {
        match self.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::from_rng(&mut rand::rng()),
        }
    }
}
