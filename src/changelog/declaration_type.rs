use crate::changelog::{label_documents, with_seed_ids};
use crate::domain::ports::{ChangeUnit, DocumentStore};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const COLLECTION: &str = "DeclarationType";

pub const INITIAL_LABELS: [&str; 3] = ["Significant event", "Complaint", "Other investigation"];

/// Insert the initial data for the DeclarationType collection.
pub struct DeclarationTypeChangeLog;

#[async_trait]
impl ChangeUnit for DeclarationTypeChangeLog {
    fn id(&self) -> &str {
        "insertInitialDeclarationTypes"
    }

    fn order(&self) -> &str {
        "001"
    }

    fn definition(&self) -> serde_json::Value {
        serde_json::json!({ "collection": COLLECTION, "labels": INITIAL_LABELS })
    }

    async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
        let docs = with_seed_ids(self.id(), COLLECTION, label_documents(&INITIAL_LABELS));
        store.insert_all(COLLECTION, docs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_should_add_initial_declaration_types() {
        let store = InMemoryStore::new();
        DeclarationTypeChangeLog.execute(&store).await.unwrap();

        let docs = store.snapshot(COLLECTION).await;
        assert_eq!(docs.len(), 3, "Unexpected collection size.");

        let labels: HashSet<&str> = docs.iter().filter_map(|d| d["label"].as_str()).collect();
        assert_eq!(labels.len(), 3, "Unexpected number of declaration type values.");
        assert!(labels.contains("Significant event"));
        assert!(labels.contains("Complaint"));
        assert!(labels.contains("Other investigation"));
    }
}
