//! Programmatic surface: build a learner from a config, train it in batches,
//! read back its greedy path and its value table.

use crate::config::{LearnerConfig, LearnerKind};
use crate::error::Result;
use crate::q_learning::{
    DqnAgent, Learner, NeuralQLearner, PathResult, TabularQLearner, TrainingObserver, ValueTable,
};

/// Owns one learner of the kind named by its config.
pub struct LearnerHandle {
    kind: LearnerKind,
    learner: Box<dyn Learner>,
}

impl LearnerHandle {
    pub fn kind(&self) -> LearnerKind {
        self.kind
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }

    pub fn learner_mut(&mut self) -> &mut dyn Learner {
        self.learner.as_mut()
    }

    pub fn episodes_trained(&self) -> usize {
        self.learner.episodes_trained()
    }
}

pub fn create_learner(config: LearnerConfig) -> Result<LearnerHandle> {
    let kind = config.learner;
    let learner: Box<dyn Learner> = match kind {
        LearnerKind::Tabular => Box::new(TabularQLearner::new(config)?),
        LearnerKind::Neural => Box::new(NeuralQLearner::new(config)?),
        LearnerKind::Deep => Box::new(DqnAgent::new(config)?),
    };
    Ok(LearnerHandle { kind, learner })
}

/// Runs up to `episodes` more episodes; returns the learner's total episode count.
pub fn train_batch(handle: &mut LearnerHandle, episodes: usize) -> Result<usize> {
    handle.learner.train_batch(episodes)
}

pub fn train_batch_with(
    handle: &mut LearnerHandle,
    episodes: usize,
    observer: &mut dyn TrainingObserver,
) -> Result<usize> {
    handle.learner.train_batch_with(episodes, observer)
}

pub fn extract_path(handle: &LearnerHandle) -> Result<PathResult> {
    handle.learner.extract_path()
}

pub fn value_table_snapshot(handle: &LearnerHandle) -> Result<ValueTable> {
    handle.learner.value_table_snapshot()
}
