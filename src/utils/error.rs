use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate key in collection '{collection}': {key}")]
    DuplicateKeyError { collection: String, key: String },

    #[error("Document store error: {message}")]
    StoreError { message: String },

    #[error("Invalid change set: {message}")]
    InvalidChangeSetError { message: String },

    #[error("Checksum mismatch for change '{change_id}': ledger has {expected}, unit now hashes to {actual}")]
    ChecksumMismatchError {
        change_id: String,
        expected: String,
        actual: String,
    },

    #[error("Change '{change_id}' failed: {message}")]
    ChangeExecutionError { change_id: String, message: String },

    #[error("Migration stopped at change '{change_id}': {source}")]
    MigrationFailed {
        change_id: String,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("Migration lock is held by '{owner}'")]
    LockUnavailableError { owner: String },
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    ChangeSet,
    Execution,
    Concurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigrationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrationError::ConfigError { .. }
            | MigrationError::ConfigValidationError { .. }
            | MigrationError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            MigrationError::IoError(_)
            | MigrationError::SerializationError(_)
            | MigrationError::DuplicateKeyError { .. }
            | MigrationError::StoreError { .. } => ErrorCategory::Storage,
            MigrationError::InvalidChangeSetError { .. }
            | MigrationError::ChecksumMismatchError { .. } => ErrorCategory::ChangeSet,
            MigrationError::ChangeExecutionError { .. } => ErrorCategory::Execution,
            MigrationError::MigrationFailed { source, .. } => source.category(),
            MigrationError::LockUnavailableError { .. } => ErrorCategory::Concurrency,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 另一個 runner 正在執行，稍後重試即可
            MigrationError::LockUnavailableError { .. } => ErrorSeverity::Medium,
            MigrationError::IoError(_) | MigrationError::StoreError { .. } => {
                ErrorSeverity::Critical
            }
            MigrationError::MigrationFailed { source, .. } => source.severity(),
            _ => ErrorSeverity::High,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Document store problem: {}", self),
            ErrorCategory::ChangeSet => format!("Change set problem: {}", self),
            ErrorCategory::Execution => format!("A migration failed: {}", self),
            ErrorCategory::Concurrency => format!("Another migration is running: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MigrationError::ChecksumMismatchError { .. } => {
                "Applied change units must not be edited; add a new change unit instead, or disable checksum validation"
            }
            MigrationError::MigrationFailed { source, .. } => source.recovery_suggestion(),
            MigrationError::DuplicateKeyError { .. } => {
                "Remove the conflicting documents or make the change unit skip existing keys"
            }
            MigrationError::InvalidChangeSetError { .. } => {
                "Make sure every change unit has a unique, non-empty id"
            }
            MigrationError::LockUnavailableError { .. } => {
                "Wait for the other runner to finish, or let the lock lease expire"
            }
            _ => match self.category() {
                ErrorCategory::Configuration => "Check the configuration file and CLI arguments",
                ErrorCategory::Storage => {
                    "Check that the document store path is reachable and writable"
                }
                _ => {
                    "Fix the failing change unit and run the migration again; failed units are retried"
                }
            },
        }
    }
}
