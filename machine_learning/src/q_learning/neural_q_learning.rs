use env::rand::Rng;
use env::Env;
use gridworld::{Action, Coordinate, GridConfig, GridWorld, Transition};
use rand_chacha::ChaCha12Rng;

use super::learner::Learner;
use super::observer::{EpisodeOutcome, EpisodeReport};
use super::path::QFunction;
use super::q_utils::{epsilon_greedy, max_q, next_state_value, NextStateValue};
use crate::config::LearnerConfig;
use crate::error::{Error, Result};
use crate::nn::{FeedForwardNetwork, Matrix};

/// Q-learning with a [`FeedForwardNetwork`] in place of the value table.
///
/// The input is a one-hot row over the grid cells and the four sigmoid outputs
/// are the action-values, so targets are clamped into `[0, 1]`.
pub struct NeuralQLearner<R: Rng = ChaCha12Rng> {
    config: LearnerConfig,
    world: GridWorld,
    network: FeedForwardNetwork,
    rng: R,
    episodes: usize,
}

impl NeuralQLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> NeuralQLearner<R> {
    pub fn with_rng(config: LearnerConfig, mut rng: R) -> Result<Self> {
        let grid = config.grid_config()?;
        let network = FeedForwardNetwork::new(grid.cell_count(), config.hidden_size, Action::COUNT, &mut rng);
        Ok(Self {
            world: GridWorld::new(grid),
            network,
            config,
            rng,
            episodes: 0,
        })
    }

    pub fn network(&self) -> &FeedForwardNetwork {
        &self.network
    }

    fn encode(&self, cell: Coordinate) -> Result<Matrix> {
        let grid = self.world.grid();
        let index = grid.index_of(cell).ok_or(Error::CellOutOfBounds(cell))?;
        let mut one_hot = vec![0.0; grid.cell_count()];
        one_hot[index] = 1.0;
        Ok(Matrix::row_vector(one_hot))
    }

    fn update(&mut self, transition: &Transition) -> Result<()> {
        let grid = self.world.grid();
        let max_next_q = match next_state_value(transition, grid.boundary(), grid.obstacle_policy()) {
            None => return Ok(()),
            Some(NextStateValue::Fixed(value)) => value,
            Some(NextStateValue::Lookup(cell)) => max_q(&self.action_values(cell)?),
        };
        let target_q = (transition.reward + self.config.discount_factor * max_next_q).clamp(0.0, 1.0);

        let input = self.encode(transition.from)?;
        let mut target = self.network.predict(&input)?.as_slice().to_vec();
        target[transition.action.index()] = target_q;
        self.network
            .train(&input, &Matrix::row_vector(target), self.config.learning_rate)?;
        Ok(())
    }
}

impl<R: Rng> QFunction for NeuralQLearner<R> {
    fn action_values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]> {
        let output = self.network.predict(&self.encode(cell)?)?;
        let mut values = [0.0; Action::COUNT];
        values.copy_from_slice(output.as_slice());
        Ok(values)
    }
}

impl<R: Rng> Learner for NeuralQLearner<R> {
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
            let values = self.action_values(state)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn learner() -> NeuralQLearner {
        NeuralQLearner::new(LearnerConfig {
            seed: Some(3),
            learner: crate::config::LearnerKind::Neural,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn network_matches_the_grid() {
        let learner = learner();
        assert_eq!(learner.network().input_size(), 16);
        assert_eq!(learner.network().output_size(), Action::COUNT);
        let values = learner.action_values(Coordinate::new(0, 0)).unwrap();
        assert!(values.iter().all(|&v| v > 0.0 && v < 1.0));
        assert!(learner.action_values(Coordinate::new(4, 0)).is_err());
    }

    #[test]
    fn winning_move_is_pulled_towards_one() {
        let mut learner = learner();
        let near_goal = Coordinate::new(0, 2);
        let win = learner.grid().step(near_goal, Action::Right);
        let before = learner.action_values(near_goal).unwrap()[Action::Right.index()];
        for _ in 0..1000 {
            learner.update(&win).unwrap();
        }
        let after = learner.action_values(near_goal).unwrap()[Action::Right.index()];
        assert!(after > before);
        assert!(after > 0.9);
    }

    #[test]
    fn off_grid_moves_are_pulled_towards_zero() {
        let mut learner = learner();
        let corner = Coordinate::new(0, 0);
        let off = learner.grid().step(corner, Action::Up);
        for _ in 0..1000 {
            learner.update(&off).unwrap();
        }
        assert!(learner.action_values(corner).unwrap()[Action::Up.index()] < 0.1);
    }

    #[test]
    fn batches_count_episodes() {
        let mut learner = learner();
        assert_eq!(learner.train_batch(5).unwrap(), 5);
        assert_eq!(learner.train_batch(3).unwrap(), 8);
        assert_eq!(learner.episodes_trained(), 8);
        assert!(learner.value_table_snapshot().is_ok());
    }
}
