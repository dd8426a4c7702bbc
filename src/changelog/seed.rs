use crate::changelog::with_seed_ids;
use crate::domain::model::Document;
use crate::domain::ports::{ChangeUnit, DocumentStore};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

fn default_fail_fast() -> bool {
    true
}

/// 由設定檔宣告的 seed 資料，寫入單一 collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedChangeUnit {
    pub id: String,
    pub order: String,
    #[serde(default)]
    pub author: String,
    pub collection: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub run_always: bool,
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

impl SeedChangeUnit {
    pub fn new(id: &str, order: &str, collection: &str, documents: Vec<Document>) -> Self {
        Self {
            id: id.to_string(),
            order: order.to_string(),
            author: String::new(),
            collection: collection.to_string(),
            documents,
            run_always: false,
            fail_fast: true,
        }
    }
}

#[async_trait]
impl ChangeUnit for SeedChangeUnit {
    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn order(&self) -> &str {
        &self.order
    }

    fn definition(&self) -> serde_json::Value {
        serde_json::json!({
            "collection": self.collection,
            "documents": self.documents,
        })
    }

    fn run_always(&self) -> bool {
        self.run_always
    }

    fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    // insert_all 本身是整批成功或失敗，不需要 rollback
    async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
        if self.documents.is_empty() {
            return store.create_collection(&self.collection).await;
        }
        let docs = with_seed_ids(&self.id, &self.collection, self.documents.clone());
        let ids = store.insert_all(&self.collection, docs).await?;
        tracing::debug!("Inserted {} documents into {}", ids.len(), self.collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::model::Filter;
    use serde_json::json;

    #[test]
    fn test_deserialize_from_toml_table() {
        let unit: SeedChangeUnit = toml::from_str(
            r#"
id = "insertGrades"
order = "010"
collection = "Grade"
documents = [
  { gradeTisId = "1", label = "F1" },
  { gradeTisId = "2", label = "F2" },
]
"#,
        )
        .unwrap();

        assert_eq!(unit.collection, "Grade");
        assert_eq!(unit.documents.len(), 2);
        assert_eq!(unit.documents[1]["label"], "F2");
        assert!(unit.fail_fast);
        assert!(!unit.run_always);
    }

    #[tokio::test]
    async fn test_execute_inserts_documents() {
        let store = InMemoryStore::new();
        let unit = SeedChangeUnit::new(
            "insertGenders",
            "001",
            "Gender",
            vec![json!({"label": "Female"}).as_object().cloned().unwrap()],
        );

        unit.execute(&store).await.unwrap();
        assert_eq!(store.count("Gender", &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_seed_creates_collection() {
        let store = InMemoryStore::new();
        SeedChangeUnit::new("createCollege", "001", "College", vec![])
            .execute(&store)
            .await
            .unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["College"]);
    }
}
