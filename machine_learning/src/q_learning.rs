mod deep_q_learning;
mod learner;
mod neural_q_learning;
mod observer;
mod parallel_q_learning;
mod path;
mod q_learning;
mod q_table;
mod q_utils;

pub use deep_q_learning::{DqnAgent, DqnSettings, DQN};
pub use learner::Learner;
pub use neural_q_learning::NeuralQLearner;
pub use observer::{
    EpisodeOutcome, EpisodeReport, LogObserver, NoopObserver, StatsObserver, TrainingObserver,
};
pub use parallel_q_learning::{parallel_seed_sweep, SweepOutcome, SweepReport};
pub use path::{extract_path, Divergence, PathResult, QFunction};
pub use q_learning::TabularQLearner;
pub use q_table::ValueTable;
pub use q_utils::{argmax_first, bellman_update, epsilon_greedy, max_q};
