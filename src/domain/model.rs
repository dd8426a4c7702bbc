use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// 儲存在 document store 中的一筆文件
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// 欄位相等條件的組合（AND）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::all().eq(ID_FIELD, Value::String(id.to_string()))
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeState {
    Executed,
    Failed,
    RolledBack,
}

/// Ledger 中的一筆記錄，append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub change_id: String,
    pub author: String,
    pub order: String,
    pub checksum: String,
    pub state: ChangeState,
    pub execution_id: String,
    pub executed_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Execute,
    RunAlways,
    Skip,
    ChecksumMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    pub change_id: String,
    pub order: String,
    pub checksum: String,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Executed,
    Skipped,
    Failed,
    RolledBack,
    ChecksumMismatch,
    Planned,
}

#[derive(Debug, Clone)]
pub struct ChangeResult {
    pub change_id: String,
    pub outcome: ChangeOutcome,
    pub duration: Duration,
    pub error: Option<String>,
}

/// 一次執行的結果摘要
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub execution_id: String,
    pub dry_run: bool,
    pub results: Vec<ChangeResult>,
    pub duration: Duration,
}

impl MigrationReport {
    pub fn count(&self, outcome: ChangeOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn executed(&self) -> usize {
        self.count(ChangeOutcome::Executed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ChangeOutcome::Skipped)
    }

    pub fn failures(&self) -> Vec<&ChangeResult> {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    ChangeOutcome::Failed
                        | ChangeOutcome::RolledBack
                        | ChangeOutcome::ChecksumMismatch
                )
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn summary(&self) -> serde_json::Value {
        let failed_changes: Vec<String> =
            self.failures().iter().map(|r| r.change_id.clone()).collect();
        serde_json::json!({
            "execution_id": self.execution_id,
            "dry_run": self.dry_run,
            "total_changes": self.results.len(),
            "executed": self.executed(),
            "skipped": self.skipped(),
            "planned": self.count(ChangeOutcome::Planned),
            "failed": self.failures().len(),
            "total_duration_ms": self.duration.as_millis() as u64,
            "failed_changes": failed_changes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Applied,
    Pending,
    Failed,
    ChecksumMismatch,
    /// 只存在於 ledger，程式中已無對應的 change unit
    Orphaned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeStatusEntry {
    pub change_id: String,
    pub status: ChangeStatus,
    pub last_entry: Option<ChangeEntry>,
}
