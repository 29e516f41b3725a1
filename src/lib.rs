pub mod algorithms;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod utils;

pub use algorithms::{CollaborativeFiltering, FitParams, FitReport};
pub use crate::config::Config;
pub use dataset::{render_table, Interner, TargetDataset, TrainingDataset};
pub use error::{CfError, EntityKind, Result};
pub use models::*;

/// Creates an empty training dataset; `None` selects the default dimension.
pub fn create_dataset(dimension: Option<usize>) -> TrainingDataset {
    TrainingDataset::new(dimension.unwrap_or(dataset::DEFAULT_DIMENSION))
}

pub fn create_target_dataset() -> TargetDataset {
    TargetDataset::new()
}

pub fn create_instance() -> CollaborativeFiltering {
    CollaborativeFiltering::new()
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
