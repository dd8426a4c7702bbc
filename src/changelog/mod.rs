// Change units shipped with the service, plus the config-driven seed unit.

pub mod covid_change_circumstance;
pub mod declaration_type;
pub mod reference_index;
pub mod seed;

pub use covid_change_circumstance::CovidChangeCircumstanceChangeLog;
pub use declaration_type::DeclarationTypeChangeLog;
pub use reference_index::ReferenceIndexChangeLog;
pub use seed::SeedChangeUnit;

use crate::domain::model::{Document, ID_FIELD};
use crate::domain::ports::ChangeUnit;

/// 沒有 `_id` 的 seed 文件依 (collection, change id, 位置) 取得固定的 UUID v5，
/// 在空的 store 上重跑會得到相同的文件。
pub(crate) fn with_seed_ids(
    change_id: &str,
    collection: &str,
    docs: Vec<Document>,
) -> Vec<Document> {
    docs.into_iter()
        .enumerate()
        .map(|(index, mut doc)| {
            if !doc.contains_key(ID_FIELD) {
                let name = format!("{}/{}/{}", collection, change_id, index);
                let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes());
                doc.insert(ID_FIELD.to_string(), serde_json::Value::String(id.to_string()));
            }
            doc
        })
        .collect()
}

pub(crate) fn label_documents(labels: &[&str]) -> Vec<Document> {
    labels
        .iter()
        .map(|label| {
            let mut doc = Document::new();
            doc.insert("label".to_string(), serde_json::Value::String(label.to_string()));
            doc
        })
        .collect()
}

pub fn builtin() -> Vec<Box<dyn ChangeUnit>> {
    vec![
        Box::new(ReferenceIndexChangeLog),
        Box::new(DeclarationTypeChangeLog),
        Box::new(CovidChangeCircumstanceChangeLog),
    ]
}
