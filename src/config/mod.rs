pub mod toml_config;

pub use toml_config::MigrationConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "reference-migrate")]
#[command(about = "Apply versioned, idempotent migrations to the trainee reference document store")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Store URI, overrides [store].uri (memory://, file:///path or a plain path)
    #[arg(long)]
    pub store: Option<String>,

    /// Execution ID recorded in the ledger for this run
    #[arg(long)]
    pub execution_id: Option<String>,

    /// Keep going after a failed change unit
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Only run change units declared in the configuration file
    #[arg(long)]
    pub skip_builtin: bool,

    /// Show the execution plan without applying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the status of every change unit and exit
    #[arg(long, conflicts_with = "dry_run")]
    pub status: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log process CPU and memory usage")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔並套用命令列覆寫
    pub fn load_config(&self) -> Result<MigrationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                MigrationConfig::from_file(path)?
            }
            None => MigrationConfig::default(),
        };

        if let Some(store) = &self.store {
            config.store.uri = store.clone();
        }
        if let Some(execution_id) = &self.execution_id {
            config.runner.execution_id = Some(execution_id.clone());
        }
        if self.continue_on_failure {
            config.runner.on_failure = Some("continue".to_string());
        }
        if self.skip_builtin {
            config.runner.include_builtin = Some(false);
        }

        Ok(config)
    }
}
