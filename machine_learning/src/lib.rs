pub mod config;
pub mod error;
pub mod handle;
pub mod nn;
pub mod q_learning;

pub use config::{LearnerConfig, LearnerKind};
pub use error::{Error, Result};
pub use handle::{
    create_learner, extract_path, train_batch, train_batch_with, value_table_snapshot,
    LearnerHandle,
};
