pub mod adapters;
pub mod changelog;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::MigrationConfig;

pub use adapters::{open_store, InMemoryStore, JsonFileStore};
pub use core::{
    engine::MigrationEngine,
    runner::{FailurePolicy, MigrationRunner, RunnerOptions},
};
pub use domain::ports::{ChangeUnit, DocumentStore};
pub use utils::error::{MigrationError, Result};
