use log::debug;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    Won,
    Lost,
    /// Hit the per-episode iteration cap before reaching a terminal cell.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EpisodeReport {
    /// 1-based, counted over the learner's whole lifetime.
    pub episode: usize,
    pub steps: usize,
    pub outcome: EpisodeOutcome,
}

/// Hooks called by [`Learner::train_batch_with`](super::Learner::train_batch_with).
pub trait TrainingObserver {
    fn on_episode(&mut self, report: &EpisodeReport);

    fn on_batch_end(&mut self, _episodes_run: usize) {}
}

pub struct NoopObserver;

impl TrainingObserver for NoopObserver {
    fn on_episode(&mut self, _report: &EpisodeReport) {}
}

/// `debug!` line every `every` episodes.
pub struct LogObserver {
    every: usize,
}

impl LogObserver {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl TrainingObserver for LogObserver {
    fn on_episode(&mut self, report: &EpisodeReport) {
        if report.episode % self.every == 0 {
            debug!(
                "episode {} finished in {} steps: {:?}",
                report.episode, report.steps, report.outcome
            );
        }
    }
}

/// Running outcome counts plus the average episode length of every complete
/// group of `group_size` episodes.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StatsObserver {
    pub wins: usize,
    pub losses: usize,
    pub aborted: usize,
    group_size: usize,
    group_steps: usize,
    group_len: usize,
    group_averages: Vec<f64>,
}

impl StatsObserver {
    pub const DEFAULT_GROUP_SIZE: usize = 10;

    pub fn new() -> Self {
        Self::with_group_size(Self::DEFAULT_GROUP_SIZE)
    }

    pub fn with_group_size(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
            ..Default::default()
        }
    }

    pub fn episodes(&self) -> usize {
        self.wins + self.losses + self.aborted
    }

    pub fn win_rate(&self) -> f64 {
        match self.episodes() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }

    /// Average steps of each finished group, oldest first.
    pub fn group_averages(&self) -> &[f64] {
        &self.group_averages
    }
}

impl TrainingObserver for StatsObserver {
    fn on_episode(&mut self, report: &EpisodeReport) {
        match report.outcome {
            EpisodeOutcome::Won => self.wins += 1,
            EpisodeOutcome::Lost => self.losses += 1,
            EpisodeOutcome::Aborted => self.aborted += 1,
        }
        self.group_steps += report.steps;
        self.group_len += 1;
        if self.group_len == self.group_size {
            self.group_averages
                .push(self.group_steps as f64 / self.group_size as f64);
            self.group_steps = 0;
            self.group_len = 0;
        }
    }
}
