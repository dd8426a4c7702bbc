use crate::changelog::{self, SeedChangeUnit};
use crate::core::lock::LockSettings;
use crate::core::runner::{FailurePolicy, RunnerOptions};
use crate::domain::ports::ChangeUnit;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_positive_number, validate_store_uri,
    validate_unique_ids, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_STORE_URI: &str = "./data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub changes: Vec<SeedChangeUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_STORE_URI.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub on_failure: Option<String>, // "stop" or "continue"
    pub validate_checksums: Option<bool>,
    pub execution_id: Option<String>,
    pub include_builtin: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockConfig {
    pub lease_seconds: Option<u64>,
    pub retry_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl MigrationConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STORE_URI})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrationError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        match &self.runner.on_failure {
            Some(value) => value.parse(),
            None => Ok(FailurePolicy::default()),
        }
    }

    pub fn include_builtin(&self) -> bool {
        self.runner.include_builtin.unwrap_or(true)
    }

    /// 內建 change unit 加上設定檔中的 [[changes]]
    pub fn change_units(&self) -> Vec<Box<dyn ChangeUnit>> {
        let mut units = if self.include_builtin() {
            changelog::builtin()
        } else {
            Vec::new()
        };
        units.extend(
            self.changes
                .iter()
                .cloned()
                .map(|unit| Box::new(unit) as Box<dyn ChangeUnit>),
        );
        units
    }

    pub fn lock_settings(&self) -> LockSettings {
        let defaults = LockSettings::default();
        LockSettings {
            lease: self
                .lock
                .lease_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.lease),
            retry_interval: self
                .lock
                .retry_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_interval),
            max_attempts: self.lock.max_attempts.unwrap_or(defaults.max_attempts),
        }
    }

    pub fn runner_options(&self) -> Result<RunnerOptions> {
        let defaults = RunnerOptions::default();
        Ok(RunnerOptions {
            execution_id: self
                .runner
                .execution_id
                .clone()
                .unwrap_or(defaults.execution_id),
            failure_policy: self.failure_policy()?,
            validate_checksums: self
                .runner
                .validate_checksums
                .unwrap_or(defaults.validate_checksums),
            dry_run: false,
            lock: self.lock_settings(),
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_store_uri("store.uri", &self.store.uri)?;

        if let Some(on_failure) = &self.runner.on_failure {
            validate_one_of(
                "runner.on_failure",
                &on_failure.to_ascii_lowercase(),
                &FailurePolicy::ALLOWED,
            )?;
        }
        if let Some(execution_id) = &self.runner.execution_id {
            validate_non_empty_string("runner.execution_id", execution_id)?;
        }

        if let Some(lease) = self.lock.lease_seconds {
            validate_positive_number("lock.lease_seconds", lease, 1)?;
        }
        if let Some(interval) = self.lock.retry_interval_ms {
            validate_positive_number("lock.retry_interval_ms", interval, 1)?;
        }
        if let Some(attempts) = self.lock.max_attempts {
            validate_positive_number("lock.max_attempts", attempts as u64, 1)?;
        }

        validate_unique_ids("changes.id", self.changes.iter().map(|c| c.id.as_str()))?;
        for change in &self.changes {
            validate_non_empty_string(&format!("changes.{}.order", change.id), &change.order)?;
            validate_non_empty_string(
                &format!("changes.{}.collection", change.id),
                &change.collection,
            )?;
        }

        Ok(())
    }
}

impl Validate for MigrationConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
