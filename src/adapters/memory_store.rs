use crate::adapters::collection::CollectionData;
use crate::domain::model::{Document, Filter};
use crate::domain::ports::DocumentStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 以記憶體保存的 store，用於測試與 dry run
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<Mutex<BTreeMap<String, CollectionData>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得某個 collection 目前的所有文件
    pub async fn snapshot(&self, collection: &str) -> Vec<Document> {
        let collections = self.collections.lock().await;
        collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.lock().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .add_unique_index(collection, field)
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<String> {
        let mut ids = self.insert_all(collection, vec![doc]).await?;
        Ok(ids.remove(0))
    }

    async fn insert_all(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert_all(collection, docs)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|c| c.find(filter))
            .unwrap_or_default())
    }

    async fn replace_one(&self, collection: &str, filter: &Filter, doc: Document) -> Result<bool> {
        let mut collections = self.collections.lock().await;
        match collections.get_mut(collection) {
            Some(data) => data.replace_one(collection, filter, doc),
            None => Ok(false),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let mut collections = self.collections.lock().await;
        Ok(collections
            .get_mut(collection)
            .map(|c| c.delete_many(filter))
            .unwrap_or(0))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let collections = self.collections.lock().await;
        Ok(collections.keys().cloned().collect())
    }
}
