use crate::changelog::{label_documents, with_seed_ids};
use crate::domain::ports::{ChangeUnit, DocumentStore};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const COLLECTION: &str = "CovidChangeCircumstance";

pub const INITIAL_LABELS: [&str; 5] = [
    "Any Period of self-isolation",
    "Moving from front line services for those in high risk groups",
    "Redeployed to support Covid-19 services",
    "Limited opportunities to curricula requirements",
    "Other",
];

pub struct CovidChangeCircumstanceChangeLog;

#[async_trait]
impl ChangeUnit for CovidChangeCircumstanceChangeLog {
    fn id(&self) -> &str {
        "insertInitialCovidChangeCircumstances"
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
