use gridworld::GridConfig;
use log::info;

use super::observer::{EpisodeOutcome, EpisodeReport, NoopObserver, TrainingObserver};
use super::path::{self, PathResult, QFunction};
use super::q_table::ValueTable;
use crate::error::Result;

/// Common surface of the tabular, neural and deep learners. Object safe, so
/// callers can hold any of them as `Box<dyn Learner>`.
pub trait Learner: QFunction {
    fn grid(&self) -> &GridConfig;

    fn episodes_trained(&self) -> usize;

    /// Lifetime cap on training episodes.
    fn episode_limit(&self) -> Option<usize>;

    /// Step budget of a greedy rollout.
    fn max_rollout_steps(&self) -> usize;

    /// Runs one episode from the start cell until a terminal cell or the
    /// per-episode iteration cap.
    fn train_episode(&mut self) -> Result<EpisodeReport>;

    /// Trains up to `episodes` more episodes and returns the updated lifetime
    /// episode count. Resumable: learned state carries over between calls.
    fn train_batch_with(&mut self, episodes: usize, observer: &mut dyn TrainingObserver) -> Result<usize> {
        let allowed = match self.episode_limit() {
            Some(limit) => episodes.min(limit.saturating_sub(self.episodes_trained())),
            None => episodes,
        };

        let mut wins = 0;
        for _ in 0..allowed {
            let report = self.train_episode()?;
            if report.outcome == EpisodeOutcome::Won {
                wins += 1;
            }
            observer.on_episode(&report);
        }
        observer.on_batch_end(allowed);

        if allowed > 0 {
            info!(
                "trained {} episodes ({} total), win rate {:.2}",
                allowed,
                self.episodes_trained(),
                wins as f64 / allowed as f64
            );
        }
        Ok(self.episodes_trained())
    }

    fn train_batch(&mut self, episodes: usize) -> Result<usize> {
        self.train_batch_with(episodes, &mut NoopObserver)
    }

    fn extract_path(&self) -> Result<PathResult> {
        path::extract_path(self, self.grid(), self.max_rollout_steps())
    }

    fn value_table_snapshot(&self) -> Result<ValueTable> {
        ValueTable::evaluate(self.grid(), self)
    }
}
