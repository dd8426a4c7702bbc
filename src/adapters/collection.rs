use crate::domain::model::{Document, Filter, ID_FIELD};
use crate::utils::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 單一 collection 的內容與索引，memory / file adapter 共用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct CollectionData {
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

pub(crate) fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// `_id` 一律是字串，缺少時補上隨機 UUID
fn with_id(collection: &str, mut doc: Document) -> Result<(String, Document)> {
    check_id_type(collection, &doc)?;
    match document_id(&doc).map(str::to_string) {
        Some(id) => Ok((id, doc)),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            Ok((id, doc))
        }
    }
}

fn check_id_type(collection: &str, doc: &Document) -> Result<()> {
    match doc.get(ID_FIELD) {
        None | Some(Value::String(_)) => Ok(()),
        Some(other) => Err(MigrationError::StoreError {
            message: format!("_id in '{}' must be a string, got {}", collection, other),
        }),
    }
}

impl CollectionData {
    fn unique_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(ID_FIELD).chain(self.indexes.iter().map(String::as_str))
    }

    /// 索引欄位缺值的文件不參與唯一性檢查
    fn check_conflict<'a, I>(&self, collection: &str, doc: &Document, others: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Document> + Clone,
    {
        for field in self.unique_fields() {
            let Some(value) = doc.get(field) else {
                continue;
            };
            if others.clone().into_iter().any(|o| o.get(field) == Some(value)) {
                return Err(MigrationError::DuplicateKeyError {
                    collection: collection.to_string(),
                    key: format!("{}: {}", field, value),
                });
            }
        }
        Ok(())
    }

    pub fn insert_all(&mut self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>> {
        let mut staged: Vec<Document> = Vec::with_capacity(docs.len());
        let mut ids = Vec::with_capacity(docs.len());

        for doc in docs {
            let (id, doc) = with_id(collection, doc)?;
            self.check_conflict(collection, &doc, self.documents.iter().chain(staged.iter()))?;
            ids.push(id);
            staged.push(doc);
        }

        self.documents.extend(staged);
        Ok(ids)
    }

    pub fn add_unique_index(&mut self, collection: &str, field: &str) -> Result<()> {
        if field == ID_FIELD || self.indexes.iter().any(|f| f == field) {
            return Ok(());
        }

        let mut seen: Vec<&Value> = Vec::new();
        for doc in &self.documents {
            if let Some(value) = doc.get(field) {
                if seen.contains(&value) {
                    return Err(MigrationError::DuplicateKeyError {
                        collection: collection.to_string(),
                        key: format!("{}: {}", field, value),
                    });
                }
                seen.push(value);
            }
        }

        self.indexes.push(field.to_string());
        Ok(())
    }

    pub fn find(&self, filter: &Filter) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect()
    }

    pub fn replace_one(
        &mut self,
        collection: &str,
        filter: &Filter,
        doc: Document,
    ) -> Result<bool> {
        let Some(position) = self.documents.iter().position(|d| filter.matches(d)) else {
            return Ok(false);
        };

        check_id_type(collection, &doc)?;
        let mut replacement = doc;
        if !replacement.contains_key(ID_FIELD) {
            if let Some(id) = self.documents[position].get(ID_FIELD) {
                replacement.insert(ID_FIELD.to_string(), id.clone());
            }
        }

        let others: Vec<&Document> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, d)| d)
            .collect();
        self.check_conflict(collection, &replacement, others.iter().copied())?;

        self.documents[position] = replacement;
        Ok(true)
    }

    pub fn delete_many(&mut self, filter: &Filter) -> usize {
        let before = self.documents.len();
        self.documents.retain(|doc| !filter.matches(doc));
        before - self.documents.len()
    }
}
