// Adapters layer: concrete DocumentStore implementations.

pub(crate) mod collection;
pub mod file_store;
pub mod memory_store;

pub use file_store::JsonFileStore;
pub use memory_store::InMemoryStore;

use crate::domain::ports::DocumentStore;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::validate_store_uri;

/// 依 URI 開啟對應的 store：`memory://`、`file:///<path>` 或一般路徑
pub async fn open_store(uri: &str) -> Result<Box<dyn DocumentStore>> {
    let url = validate_store_uri("store.uri", uri)?;

    match url.scheme() {
        "memory" => {
            tracing::warn!("Using in-memory store; applied changes will not persist");
            Ok(Box::new(InMemoryStore::new()))
        }
        "file" => {
            let path = url.to_file_path().map_err(|_| MigrationError::ConfigError {
                message: format!("Store URI is not a local path: {}", uri),
            })?;
            Ok(Box::new(JsonFileStore::open(path).await?))
        }
        other => Err(MigrationError::ConfigError {
            message: format!("Unsupported store scheme: {}", other),
        }),
    }
}
