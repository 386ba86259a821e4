use env::rand::Rng;
use env::Env;
use gridworld::{Action, Coordinate, GridConfig, GridWorld, Transition};
use rand_chacha::ChaCha12Rng;

use super::learner::Learner;
use super::observer::{EpisodeOutcome, EpisodeReport};
use super::path::QFunction;
use super::q_table::ValueTable;
use super::q_utils::{bellman_update, epsilon_greedy, next_state_value};
use crate::config::LearnerConfig;
use crate::error::{Error, Result};

/// Epsilon-greedy Q-learning over a [`ValueTable`].
pub struct TabularQLearner<R: Rng = ChaCha12Rng> {
    config: LearnerConfig,
    world: GridWorld,
    table: ValueTable,
    rng: R,
    episodes: usize,
}

impl TabularQLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> TabularQLearner<R> {
    pub fn with_rng(config: LearnerConfig, rng: R) -> Result<Self> {
        let grid = config.grid_config()?;
        Ok(Self {
            table: ValueTable::new(grid.size()),
            world: GridWorld::new(grid),
            config,
            rng,
            episodes: 0,
        })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    fn values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]> {
        self.table
            .action_values(cell)
            .ok_or(Error::CellOutOfBounds(cell))
    }

    fn update(&mut self, transition: &Transition) -> Result<()> {
        let grid = self.world.grid();
        let Some(next) = next_state_value(transition, grid.boundary(), grid.obstacle_policy()) else {
            return Ok(());
        };
        let max_next_q = next.resolve(|cell| self.table.max_value(cell).unwrap_or(0.0));
        let current_q = self.values(transition.from)?[transition.action.index()];
        let updated = bellman_update(
            current_q,
            transition.reward,
            max_next_q,
            self.config.alpha,
            self.config.discount_factor,
        );
        self.table.set(transition.from, transition.action, updated)
    }
}

impl<R: Rng> QFunction for TabularQLearner<R> {
    fn action_values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]> {
        self.values(cell)
    }
}

impl<R: Rng> Learner for TabularQLearner<R> {
    fn grid(&self) -> &GridConfig {
        self.world.grid()
    }

    fn episodes_trained(&self) -> usize {
        self.episodes
    }

    fn episode_limit(&self) -> Option<usize> {
        self.config.episode_limit
    }

    fn max_rollout_steps(&self) -> usize {
        self.config.max_rollout_steps()
    }

    fn train_episode(&mut self) -> Result<EpisodeReport> {
        let mut state = self.world.reset();
        let mut outcome = EpisodeOutcome::Aborted;

        for _ in 0..self.config.max_episode_steps {
            let values = self.values(state)?;
            let action = epsilon_greedy(&values, self.config.epsilon, &mut self.rng);
            let (next_state, transition) = self.world.step(action);
            self.update(&transition)?;
            state = next_state;

            if transition.is_terminal() {
                outcome = if transition.is_win() {
                    EpisodeOutcome::Won
                } else {
                    EpisodeOutcome::Lost
                };
                break;
            }
        }

        self.episodes += 1;
        Ok(EpisodeReport {
            episode: self.episodes,
            steps: self.world.steps(),
            outcome,
        })
    }
}
