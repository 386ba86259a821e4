use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{loss, AdamW, Linear, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use env::rand::Rng;
use env::Env;
use gridworld::{Action, BoundaryPolicy, CellKind, Coordinate, GridConfig, GridWorld, Transition};
use rand_chacha::ChaCha12Rng;

use super::learner::Learner;
use super::observer::{EpisodeOutcome, EpisodeReport, StatsObserver, TrainingObserver};
use super::path::QFunction;
use super::q_utils::{epsilon_greedy, max_q};
use crate::config::LearnerConfig;
use crate::error::Result;

// 2 -> hidden (relu) -> hidden (relu) -> 4 (linear)
pub struct DQN {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
}

impl DQN {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, vb: VarBuilder) -> Result<Self> {
        let fc1 = candle_nn::linear(input_size, hidden_size, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(hidden_size, hidden_size, vb.pp("fc2"))?;
        let fc3 = candle_nn::linear(hidden_size, output_size, vb.pp("fc3"))?;
        Ok(Self { fc1, fc2, fc3 })
    }
}

impl Module for DQN {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.fc1.forward(x)?.relu()?;
        let x = self.fc2.forward(&x)?.relu()?;
        self.fc3.forward(&x)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DqnSettings {
    pub learning_rate: f64,
    pub discount_factor: f32,
    pub hidden_size: usize,
    pub epsilon: f32,
    /// Applied after every training step.
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
}

impl Default for DqnSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            discount_factor: 0.95,
            hidden_size: 24,
            epsilon: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
        }
    }
}

/// Online deep Q-learning on candle: one transition per gradient step, no
/// replay buffer and no target network.
///
/// The state is the raw `[row, col]` pair. Rewards are shaped with a living
/// cost that shrinks towards the goal, and the grid always clamps at its
/// border. Candle initialises the weights from its own RNG, so only the
/// exploration draws follow the configured seed.
pub struct DqnAgent<R: Rng = ChaCha12Rng> {
    config: LearnerConfig,
    settings: DqnSettings,
    world: GridWorld,
    network: DQN,
    optimizer: AdamW,
    device: Device,
    epsilon: f32,
    rng: R,
    episodes: usize,
    stats: StatsObserver,
}

impl DqnAgent {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(config, DqnSettings::default(), rng)
    }
}

impl<R: Rng> DqnAgent<R> {
    pub fn with_rng(config: LearnerConfig, settings: DqnSettings, rng: R) -> Result<Self> {
        let grid = config.grid_config()?.with_boundary(BoundaryPolicy::Clamp);
        let device = Device::Cpu;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let network = DQN::new(2, settings.hidden_size, Action::COUNT, vb)?;
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: settings.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        Ok(Self {
            config,
            settings,
            world: GridWorld::new(grid),
            network,
            optimizer,
            device,
            epsilon: settings.epsilon,
            rng,
            episodes: 0,
            stats: StatsObserver::new(),
        })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Average episode length of each finished group of ten episodes.
    pub fn aggregates(&self) -> &[f64] {
        self.stats.group_averages()
    }

    fn encode(&self, cell: Coordinate) -> Result<Tensor> {
        Ok(Tensor::from_vec(
            vec![cell.row as f32, cell.col as f32],
            (1, 2),
            &self.device,
        )?)
    }

    fn living_cost(&self, cell: Coordinate) -> f32 {
        -(cell.manhattan(self.world.grid().goal()) as f32) / 100.0
    }

    /// Reward seen by the network, replacing the grid's own.
    fn shaped_reward(&self, transition: &Transition) -> f32 {
        match transition.hit {
            CellKind::Win => 1.0,
            CellKind::Lose => -1.0,
            CellKind::Obstacle => 2.0 * self.living_cost(transition.next),
            CellKind::Open | CellKind::OutOfBounds => self.living_cost(transition.next),
        }
    }

    fn train_step(&mut self, transition: &Transition) -> Result<f32> {
        let reward = self.shaped_reward(transition);
        let target_q = if transition.is_terminal() {
            reward
        } else {
            let next = self.action_values(transition.next)?;
            reward + self.settings.discount_factor * max_q(&next) as f32
        };

        let current = self.network.forward(&self.encode(transition.from)?)?;
        let mut target = current.detach().squeeze(0)?.to_vec1::<f32>()?;
        target[transition.action.index()] = target_q;
        let target = Tensor::from_vec(target, (1, Action::COUNT), &self.device)?;

        let loss = loss::mse(&current, &target)?;
        self.optimizer.backward_step(&loss)?;

        self.epsilon = (self.epsilon * self.settings.epsilon_decay).max(self.settings.epsilon_min);
        Ok(loss.to_scalar::<f32>()?)
    }
}

impl<R: Rng> QFunction for DqnAgent<R> {
    fn action_values(&self, cell: Coordinate) -> Result<[f64; Action::COUNT]> {
        let output = self
            .network
            .forward(&self.encode(cell)?)?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        let mut values = [0.0; Action::COUNT];
        for (value, q) in values.iter_mut().zip(output) {
            *value = q as f64;
        }
        Ok(values)
    }
}

impl<R: Rng> Learner for DqnAgent<R> {
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
            let action = epsilon_greedy(&values, self.epsilon as f64, &mut self.rng);
            let (next_state, transition) = self.world.step(action);
            self.train_step(&transition)?;
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
        let report = EpisodeReport {
            episode: self.episodes,
            steps: self.world.steps(),
            outcome,
        };
        self.stats.on_episode(&report);
        Ok(report)
    }
}
