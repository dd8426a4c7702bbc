use crate::adapters::collection::CollectionData;
use crate::domain::model::{Document, Filter};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{MigrationError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const COLLECTION_EXTENSION: &str = "json";

/// 以 JSON 檔案保存的 document store，每個 collection 一個檔案
#[derive(Debug)]
pub struct JsonFileStore {
    base_path: PathBuf,
    // 同一個 process 內的寫入依序進行
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path).await?;
        tracing::debug!("Opened JSON file store at {}", base_path.display());

        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        if collection.is_empty()
            || collection.starts_with('.')
            || collection.contains(['/', '\\', '\0'])
        {
            return Err(MigrationError::StoreError {
                message: format!("Invalid collection name: {:?}", collection),
            });
        }
        Ok(self
            .base_path
            .join(format!("{}.{}", collection, COLLECTION_EXTENSION)))
    }

    async fn read_collection(&self, collection: &str) -> Result<Option<CollectionData>> {
        let path = self.collection_path(collection)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MigrationError::IoError(e)),
        }
    }

    /// 先寫暫存檔再 rename，避免留下寫一半的檔案
    async fn write_collection(&self, collection: &str, data: &CollectionData) -> Result<()> {
        let path = self.collection_path(collection)?;
        let tmp_path = path.with_extension(format!("{}.tmp", COLLECTION_EXTENSION));

        let bytes = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn modify<T, F>(&self, collection: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut CollectionData) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read_collection(collection).await?.unwrap_or_default();
        let result = f(&mut data)?;
        self.write_collection(collection, &data).await?;
        Ok(result)
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read_collection(collection).await?.is_none() {
            self.write_collection(collection, &CollectionData::default())
                .await?;
        }
        Ok(())
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        self.modify(collection, |data| data.add_unique_index(collection, field))
            .await
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<String> {
        let mut ids = self.insert_all(collection, vec![doc]).await?;
        Ok(ids.remove(0))
    }

    async fn insert_all(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>> {
        self.modify(collection, |data| data.insert_all(collection, docs))
            .await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let _guard = self.write_lock.lock().await;
        Ok(self
            .read_collection(collection)
            .await?
            .map(|data| data.find(filter))
            .unwrap_or_default())
    }

    async fn replace_one(&self, collection: &str, filter: &Filter, doc: Document) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut data) = self.read_collection(collection).await? else {
            return Ok(false);
        };
        let replaced = data.replace_one(collection, filter, doc)?;
        if replaced {
            self.write_collection(collection, &data).await?;
        }
        Ok(replaced)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let Some(mut data) = self.read_collection(collection).await? else {
            return Ok(0);
        };
        let deleted = data.delete_many(filter);
        if deleted > 0 {
            self.write_collection(collection, &data).await?;
        }
        Ok(deleted)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(COLLECTION_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
