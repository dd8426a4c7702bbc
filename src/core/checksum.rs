use crate::domain::ports::ChangeUnit;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// 物件 key 遞迴排序，讓相同內容得到相同輸出
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

pub fn compute_checksum(id: &str, order: &str, definition: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update([0]);
    hasher.update(order.as_bytes());
    hasher.update([0]);
    hasher.update(canonicalize(definition).to_string().as_bytes());
    hex::encode(hasher.finalize())
}

pub fn checksum_of(unit: &dyn ChangeUnit) -> String {
    compute_checksum(unit.id(), unit.order(), &unit.definition())
}
