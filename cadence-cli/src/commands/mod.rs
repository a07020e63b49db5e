//! CLI subcommand implementations

pub mod merge;
pub mod run;
pub mod stabilize;

use std::sync::Arc;

use cadence_core::{Config, ModelResolver};

pub use merge::MergeArgs;
pub use run::RunArgs;
pub use stabilize::StabilizeArgs;

/// Build a model resolver from the loaded configuration
pub(crate) fn model_resolver(config: &Config) -> ModelResolver {
    let config = config.clone();
    Arc::new(move |role| config.model_for(role))
}
