use crate::domain::model::{ChangeEntry, Document, Filter};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{MigrationError, Result};
use std::collections::HashMap;

pub const CHANGE_LOG_COLLECTION: &str = "migrationChangeLog";

/// 已套用狀態的紀錄，保存在 store 本身
pub struct ChangeLedger<'a> {
    store: &'a dyn DocumentStore,
    collection: String,
}

impl<'a> ChangeLedger<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self::with_collection(store, CHANGE_LOG_COLLECTION)
    }

    pub fn with_collection(store: &'a dyn DocumentStore, collection: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
        }
    }

    async fn entries(&self, filter: &Filter) -> Result<Vec<ChangeEntry>> {
        let mut entries = self
            .store
            .find(&self.collection, filter)
            .await?
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<ChangeEntry>(serde_json::Value::Object(doc))
                    .map_err(MigrationError::from)
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    /// 每個 change 只取 seq 最大的那筆
    pub async fn load(&self) -> Result<HashMap<String, ChangeEntry>> {
        let mut latest: HashMap<String, ChangeEntry> = HashMap::new();
        for entry in self.entries(&Filter::all()).await? {
            latest.insert(entry.change_id.clone(), entry);
        }
        Ok(latest)
    }

    pub async fn history(&self, change_id: &str) -> Result<Vec<ChangeEntry>> {
        self.entries(&Filter::all().eq("changeId", change_id)).await
    }

    pub async fn record(&self, mut entry: ChangeEntry) -> Result<ChangeEntry> {
        let next_seq = self
            .entries(&Filter::all())
            .await?
            .last()
            .map(|e| e.seq + 1)
            .unwrap_or(1);
        entry.seq = next_seq;

        let doc: Document = match serde_json::to_value(&entry)? {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(MigrationError::StoreError {
                    message: "Ledger entry did not serialize to an object".to_string(),
                })
            }
        };
        self.store.insert_one(&self.collection, doc).await?;

        tracing::debug!(
            "📝 Ledger: {} -> {:?} (seq {})",
            entry.change_id,
            entry.state,
            entry.seq
        );
        Ok(entry)
    }
}
