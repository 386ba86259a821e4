use gridworld::Coordinate;
use rayon::prelude::*;
use serde::Serialize;

use super::path::Divergence;
use crate::config::LearnerConfig;
use crate::error::Result;
use crate::handle::{create_learner, extract_path, train_batch};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub seed: u64,
    pub complete: bool,
    pub moves: usize,
    pub end: Option<Coordinate>,
    pub divergence: Option<Divergence>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepReport {
    /// In seed order.
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    /// Share of seeds whose greedy path reached the goal.
    pub fn convergence_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let complete = self.outcomes.iter().filter(|o| o.complete).count();
        complete as f64 / self.outcomes.len() as f64
    }

    /// Mean path length over the converged seeds.
    pub fn mean_moves(&self) -> Option<f64> {
        let moves: Vec<usize> = self
            .outcomes
            .iter()
            .filter(|o| o.complete)
            .map(|o| o.moves)
            .collect();
        (!moves.is_empty()).then(|| moves.iter().sum::<usize>() as f64 / moves.len() as f64)
    }
}

/// Trains one independent learner per seed on the rayon pool in scope and
/// extracts each greedy path. Learners share nothing; only `config.seed` differs.
pub fn parallel_seed_sweep(config: &LearnerConfig, seeds: &[u64], episodes: usize) -> Result<SweepReport> {
    config.validate()?;

    let outcomes = seeds
        .par_iter()
        .map(|&seed| {
            let config = LearnerConfig {
                seed: Some(seed),
                ..config.clone()
            };
            let mut handle = create_learner(config)?;
            train_batch(&mut handle, episodes)?;
            let result = extract_path(&handle)?;
            Ok(SweepOutcome {
                seed,
                complete: result.complete,
                moves: result.moves(),
                end: result.end(),
                divergence: result.divergence,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SweepReport { outcomes })
}
