use crate::domain::model::{Document, Filter};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Document store 的抽象，所有 adapter 都實作這個介面
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_collection(&self, collection: &str) -> Result<()>;

    /// 建立單一欄位的唯一索引；已存在的資料違反時回傳 DuplicateKeyError
    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()>;

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<String>;

    /// 整批寫入，任一筆失敗則全部不寫入
    async fn insert_all(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// 取代第一筆符合條件的文件，回傳是否有符合的文件
    async fn replace_one(&self, collection: &str, filter: &Filter, doc: Document) -> Result<bool>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<usize>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize> {
        Ok(self.find(collection, filter).await?.len())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    async fn list_collections(&self) -> Result<Vec<String>>;
}

/// 一個版本化的 migration 單位
#[async_trait]
pub trait ChangeUnit: Send + Sync {
    fn id(&self) -> &str;

    fn author(&self) -> &str {
        ""
    }

    /// 字典序比較，例如 "001"
    fn order(&self) -> &str;

    /// 納入 checksum 的宣告內容
    fn definition(&self) -> serde_json::Value;

    fn run_always(&self) -> bool {
        false
    }

    fn fail_fast(&self) -> bool {
        true
    }

    async fn execute(&self, store: &dyn DocumentStore) -> Result<()>;

    /// 回傳 true 代表有執行 rollback
    async fn rollback(&self, _store: &dyn DocumentStore) -> Result<bool> {
        Ok(false)
    }
}
