use crate::domain::ports::{ChangeUnit, DocumentStore};
use crate::utils::error::Result;
use async_trait::async_trait;

/// (collection, field) pairs that must stay unique per reference entity.
pub const TIS_ID_INDEXES: [(&str, &str); 4] = [
    ("College", "collegeTisId"),
    ("Gender", "genderTisId"),
    ("LocalOffice", "localOfficeTisId"),
    ("Qualification", "qualificationTisId"),
];

pub struct ReferenceIndexChangeLog;

#[async_trait]
impl ChangeUnit for ReferenceIndexChangeLog {
    fn id(&self) -> &str {
        "createReferenceTisIdIndexes"
    }

    fn order(&self) -> &str {
        "000"
    }

    fn definition(&self) -> serde_json::Value {
        let indexes: Vec<serde_json::Value> = TIS_ID_INDEXES
            .iter()
            .map(|(collection, field)| {
                serde_json::json!({ "collection": collection, "field": field, "unique": true })
            })
            .collect();
        serde_json::json!({ "indexes": indexes })
    }

    async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
        for (collection, field) in TIS_ID_INDEXES {
            store.create_collection(collection).await?;
            store.create_unique_index(collection, field).await?;
            tracing::debug!("Ensured unique index {}.{}", collection, field);
        }
        Ok(())
    }
}
