use crate::core::checksum::checksum_of;
use crate::core::ledger::ChangeLedger;
use crate::core::lock::{LockSettings, MigrationLock};
use crate::domain::model::{
    ChangeEntry, ChangeOutcome, ChangeResult, ChangeState, ChangeStatus, ChangeStatusEntry,
    MigrationReport, PlannedAction, PlannedChange,
};
use crate::domain::ports::{ChangeUnit, DocumentStore};
use crate::utils::error::{MigrationError, Result};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Stop,
    Continue,
}

impl FailurePolicy {
    pub const ALLOWED: [&'static str; 2] = ["stop", "continue"];
}

impl FromStr for FailurePolicy {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(FailurePolicy::Stop),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(MigrationError::InvalidConfigValueError {
                field: "runner.on_failure".to_string(),
                value: other.to_string(),
                reason: format!("Allowed values: {}", Self::ALLOWED.join(", ")),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub execution_id: String,
    pub failure_policy: FailurePolicy,
    pub validate_checksums: bool,
    pub dry_run: bool,
    pub lock: LockSettings,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            execution_id: new_execution_id(),
            failure_policy: FailurePolicy::Stop,
            validate_checksums: true,
            dry_run: false,
            lock: LockSettings::default(),
        }
    }
}

pub fn new_execution_id() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    )
}

/// 依序套用 change unit，每個 unit 只執行一次
pub struct MigrationRunner<'a> {
    store: &'a dyn DocumentStore,
    units: Vec<Box<dyn ChangeUnit>>,
    options: RunnerOptions,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(store: &'a dyn DocumentStore, options: RunnerOptions) -> Self {
        Self {
            store,
            units: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn register(&mut self, unit: Box<dyn ChangeUnit>) {
        self.units.push(unit);
    }

    pub fn register_all<I>(&mut self, units: I)
    where
        I: IntoIterator<Item = Box<dyn ChangeUnit>>,
    {
        self.units.extend(units);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 驗證 id 後依 (order, id) 排序
    fn ordered(&self) -> Result<Vec<&dyn ChangeUnit>> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.id().trim().is_empty() {
                return Err(MigrationError::InvalidChangeSetError {
                    message: format!("Change unit with order '{}' has an empty id", unit.order()),
                });
            }
            if !seen.insert(unit.id()) {
                return Err(MigrationError::InvalidChangeSetError {
                    message: format!("Duplicate change unit id '{}'", unit.id()),
                });
            }
        }

        let mut units: Vec<&dyn ChangeUnit> = self.units.iter().map(|u| u.as_ref()).collect();
        units.sort_by(|a, b| a.order().cmp(b.order()).then_with(|| a.id().cmp(b.id())));
        Ok(units)
    }

    fn decide(
        &self,
        unit: &dyn ChangeUnit,
        checksum: &str,
        latest: Option<&ChangeEntry>,
    ) -> PlannedAction {
        if unit.run_always() {
            if latest.is_some_and(|entry| entry.checksum != checksum) {
                tracing::info!(
                    "🔁 run_always change '{}' was modified; running the new definition",
                    unit.id()
                );
            }
            return PlannedAction::RunAlways;
        }

        match latest {
            Some(entry) if entry.state == ChangeState::Executed => {
                if entry.checksum == checksum {
                    PlannedAction::Skip
                } else if self.options.validate_checksums {
                    PlannedAction::ChecksumMismatch
                } else {
                    tracing::warn!(
                        "⚠️ Change '{}' was modified after it was applied; skipping (checksum validation disabled)",
                        unit.id()
                    );
                    PlannedAction::Skip
                }
            }
            _ => PlannedAction::Execute,
        }
    }

    fn should_stop(&self, unit: &dyn ChangeUnit) -> bool {
        self.options.failure_policy == FailurePolicy::Stop && unit.fail_fast()
    }

    /// 不寫入任何資料，只回傳每個 unit 的處理方式
    pub async fn plan(&self) -> Result<Vec<PlannedChange>> {
        let units = self.ordered()?;
        let latest = ChangeLedger::new(self.store).load().await?;

        Ok(units
            .into_iter()
            .map(|unit| {
                let checksum = checksum_of(unit);
                let action = self.decide(unit, &checksum, latest.get(unit.id()));
                PlannedChange {
                    change_id: unit.id().to_string(),
                    order: unit.order().to_string(),
                    checksum,
                    action,
                }
            })
            .collect())
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let started = Instant::now();

        if self.options.dry_run {
            return self.dry_run(started).await;
        }

        let units = self.ordered()?;
        tracing::info!(
            "🚀 Applying {} change units (execution {})",
            units.len(),
            self.options.execution_id
        );

        let lock = MigrationLock::new(
            self.store,
            &self.options.execution_id,
            self.options.lock.clone(),
        );
        lock.acquire().await?;

        let applied = self.apply(&lock, &units).await;
        let released = lock.release().await;

        let results = applied?;
        released?;

        let report = MigrationReport {
            execution_id: self.options.execution_id.clone(),
            dry_run: false,
            results,
            duration: started.elapsed(),
        };
        tracing::info!(
            "✅ Migration finished: {} executed, {} skipped, {} failed ({:?})",
            report.executed(),
            report.skipped(),
            report.failures().len(),
            report.duration
        );
        Ok(report)
    }

    async fn dry_run(&self, started: Instant) -> Result<MigrationReport> {
        let plan = self.plan().await?;
        let results = plan
            .into_iter()
            .map(|planned| {
                let outcome = match planned.action {
                    PlannedAction::Execute | PlannedAction::RunAlways => ChangeOutcome::Planned,
                    PlannedAction::Skip => ChangeOutcome::Skipped,
                    PlannedAction::ChecksumMismatch => ChangeOutcome::ChecksumMismatch,
                };
                tracing::info!("🔎 [dry-run] {} -> {:?}", planned.change_id, planned.action);
                ChangeResult {
                    change_id: planned.change_id,
                    outcome,
                    duration: Duration::ZERO,
                    error: None,
                }
            })
            .collect();

        Ok(MigrationReport {
            execution_id: self.options.execution_id.clone(),
            dry_run: true,
            results,
            duration: started.elapsed(),
        })
    }

    async fn apply(
        &self,
        lock: &MigrationLock<'_>,
        units: &[&dyn ChangeUnit],
    ) -> Result<Vec<ChangeResult>> {
        let ledger = ChangeLedger::new(self.store);
        let latest = ledger.load().await?;
        let mut results = Vec::with_capacity(units.len());

        for &unit in units {
            let checksum = checksum_of(unit);
            let action = self.decide(unit, &checksum, latest.get(unit.id()));

            match action {
                PlannedAction::Skip => {
                    tracing::debug!("⏭️ Skipping already applied change: {}", unit.id());
                    results.push(ChangeResult {
                        change_id: unit.id().to_string(),
                        outcome: ChangeOutcome::Skipped,
                        duration: Duration::ZERO,
                        error: None,
                    });
                }
                PlannedAction::ChecksumMismatch => {
                    let expected = latest
                        .get(unit.id())
                        .map(|e| e.checksum.clone())
                        .unwrap_or_default();
                    let error = MigrationError::ChecksumMismatchError {
                        change_id: unit.id().to_string(),
                        expected,
                        actual: checksum,
                    };
                    tracing::error!("❌ {}", error);
                    results.push(ChangeResult {
                        change_id: unit.id().to_string(),
                        outcome: ChangeOutcome::ChecksumMismatch,
                        duration: Duration::ZERO,
                        error: Some(error.to_string()),
                    });
                    if self.should_stop(unit) {
                        return Err(MigrationError::MigrationFailed {
                            change_id: unit.id().to_string(),
                            source: Box::new(error),
                        });
                    }
                }
                PlannedAction::Execute | PlannedAction::RunAlways => {
                    // lease 被接手就不能再寫入，不受 failure policy 影響
                    lock.refresh().await?;
                    let (result, failure) = self.execute_unit(&ledger, unit, checksum).await?;
                    results.push(result);
                    if let Some(error) = failure {
                        if self.should_stop(unit) {
                            return Err(MigrationError::MigrationFailed {
                                change_id: unit.id().to_string(),
                                source: Box::new(error),
                            });
                        }
                        tracing::warn!("⚠️ Continuing after failed change: {}", unit.id());
                    }
                }
            }
        }

        Ok(results)
    }

    fn entry(
        &self,
        unit: &dyn ChangeUnit,
        checksum: &str,
        state: ChangeState,
        duration: Duration,
    ) -> ChangeEntry {
        ChangeEntry {
            change_id: unit.id().to_string(),
            author: unit.author().to_string(),
            order: unit.order().to_string(),
            checksum: checksum.to_string(),
            state,
            execution_id: self.options.execution_id.clone(),
            executed_at: chrono::Utc::now(),
            duration_ms: duration.as_millis() as u64,
            error: None,
            seq: 0,
        }
    }

    /// 回傳執行結果；失敗時同時回傳原始錯誤
    async fn execute_unit(
        &self,
        ledger: &ChangeLedger<'_>,
        unit: &dyn ChangeUnit,
        checksum: String,
    ) -> Result<(ChangeResult, Option<MigrationError>)> {
        tracing::info!("▶️ Executing change {} (order {})", unit.id(), unit.order());
        let started = Instant::now();

        match unit.execute(self.store).await {
            Ok(()) => {
                let duration = started.elapsed();
                ledger
                    .record(self.entry(unit, &checksum, ChangeState::Executed, duration))
                    .await?;
                tracing::info!("✅ Change applied: {} ({:?})", unit.id(), duration);
                Ok((
                    ChangeResult {
                        change_id: unit.id().to_string(),
                        outcome: ChangeOutcome::Executed,
                        duration,
                        error: None,
                    },
                    None,
                ))
            }
            Err(error) => {
                let duration = started.elapsed();
                tracing::error!("❌ Change failed: {}: {}", unit.id(), error);

                let mut failed = self.entry(unit, &checksum, ChangeState::Failed, duration);
                failed.error = Some(error.to_string());
                ledger.record(failed).await?;

                let rolled_back = match unit.rollback(self.store).await {
                    Ok(true) => {
                        let rolled_back =
                            self.entry(unit, &checksum, ChangeState::RolledBack, started.elapsed());
                        ledger.record(rolled_back).await?;
                        tracing::info!("↩️ Rolled back change: {}", unit.id());
                        true
                    }
                    Ok(false) => false,
                    Err(rollback_error) => {
                        tracing::error!("❌ Rollback of {} failed: {}", unit.id(), rollback_error);
                        false
                    }
                };

                let result = ChangeResult {
                    change_id: unit.id().to_string(),
                    outcome: if rolled_back {
                        ChangeOutcome::RolledBack
                    } else {
                        ChangeOutcome::Failed
                    },
                    duration,
                    error: Some(error.to_string()),
                };
                Ok((result, Some(error)))
            }
        }
    }

    pub async fn status(&self) -> Result<Vec<ChangeStatusEntry>> {
        let units = self.ordered()?;
        let mut latest: HashMap<String, ChangeEntry> =
            ChangeLedger::new(self.store).load().await?;
        let mut statuses = Vec::with_capacity(units.len());

        for unit in units {
            let entry = latest.remove(unit.id());
            let status = match &entry {
                None => ChangeStatus::Pending,
                Some(e) if e.state == ChangeState::Executed => {
                    if e.checksum == checksum_of(unit) {
                        ChangeStatus::Applied
                    } else if unit.run_always() {
                        // 下次執行時會套用新的定義
                        ChangeStatus::Pending
                    } else {
                        ChangeStatus::ChecksumMismatch
                    }
                }
                Some(_) => ChangeStatus::Failed,
            };
            statuses.push(ChangeStatusEntry {
                change_id: unit.id().to_string(),
                status,
                last_entry: entry,
            });
        }

        let mut orphaned: Vec<ChangeEntry> = latest.into_values().collect();
        orphaned.sort_by(|a, b| a.change_id.cmp(&b.change_id));
        statuses.extend(orphaned.into_iter().map(|entry| ChangeStatusEntry {
            change_id: entry.change_id.clone(),
            status: ChangeStatus::Orphaned,
            last_entry: Some(entry),
        }));

        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::core::ledger::CHANGE_LOG_COLLECTION;
    use crate::core::lock::LOCK_COLLECTION;
    use std::sync::atomic::AtomicBool;
    use crate::domain::model::{Document, Filter};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockUnit {
        id: String,
        order: String,
        version: u32,
        fail: bool,
        fail_fast: bool,
        run_always: bool,
        can_rollback: bool,
        executions: Arc<AtomicUsize>,
    }

    impl MockUnit {
        fn new(id: &str, order: &str) -> Self {
            Self {
                id: id.to_string(),
                order: order.to_string(),
                version: 1,
                fail: false,
                fail_fast: true,
                run_always: false,
                can_rollback: false,
                executions: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn with_version(mut self, version: u32) -> Self {
            self.version = version;
            self
        }

        fn not_fail_fast(mut self) -> Self {
            self.fail_fast = false;
            self
        }

        fn always(mut self) -> Self {
            self.run_always = true;
            self
        }

        fn with_rollback(mut self) -> Self {
            self.can_rollback = true;
            self
        }

        fn counter(&self) -> Arc<AtomicUsize> {
            self.executions.clone()
        }
    }

    #[async_trait]
    impl ChangeUnit for MockUnit {
        fn id(&self) -> &str {
            &self.id
        }

        fn order(&self) -> &str {
            &self.order
        }

        fn definition(&self) -> serde_json::Value {
            json!({"version": self.version})
        }

        fn run_always(&self) -> bool {
            self.run_always
        }

        fn fail_fast(&self) -> bool {
            self.fail_fast
        }

        async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            let doc: Document = json!({"unit": self.id}).as_object().cloned().unwrap();
            store.insert_one("executions", doc).await?;
            if self.fail {
                return Err(MigrationError::ChangeExecutionError {
                    change_id: self.id.clone(),
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn rollback(&self, store: &dyn DocumentStore) -> Result<bool> {
            if !self.can_rollback {
                return Ok(false);
            }
            store
                .delete_many("executions", &Filter::all().eq("unit", self.id.clone()))
                .await?;
            Ok(true)
        }
    }

    /// 執行期間以相同 execution id 再啟動一個 runner
    struct ConcurrentRunUnit {
        blocked: Arc<AtomicBool>,
        lock_kept: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ChangeUnit for ConcurrentRunUnit {
        fn id(&self) -> &str {
            "concurrent"
        }

        fn order(&self) -> &str {
            "001"
        }

        fn definition(&self) -> serde_json::Value {
            json!({})
        }

        async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
            let mut other = MigrationRunner::new(store, options());
            other.register(Box::new(MockUnit::new("other", "001")));
            let blocked = matches!(
                other.run().await,
                Err(MigrationError::LockUnavailableError { .. })
            );
            self.blocked.store(blocked, Ordering::SeqCst);

            let held = store.count(LOCK_COLLECTION, &Filter::all()).await?;
            self.lock_kept.store(held == 1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// 模擬 lease 過期後被另一個 runner 接手
    struct TakeoverUnit;

    #[async_trait]
    impl ChangeUnit for TakeoverUnit {
        fn id(&self) -> &str {
            "takeover"
        }

        fn order(&self) -> &str {
            "001"
        }

        fn definition(&self) -> serde_json::Value {
            json!({})
        }

        async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
            let other = MigrationLock::new(store, "other-runner", LockSettings::default());
            other.acquire().await
        }
    }

    fn options() -> RunnerOptions {
        RunnerOptions {
            execution_id: "test-run".to_string(),
            lock: LockSettings {
                retry_interval: Duration::from_millis(1),
                max_attempts: 1,
                ..LockSettings::default()
            },
            ..RunnerOptions::default()
        }
    }

    async fn executed_units(store: &InMemoryStore) -> Vec<String> {
        store
            .snapshot("executions")
            .await
            .iter()
            .map(|d| d["unit"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_units_run_in_order_regardless_of_registration() {
        let store = InMemoryStore::new();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("c", "002")));
        runner.register(Box::new(MockUnit::new("b", "001")));
        runner.register(Box::new(MockUnit::new("a", "001")));

        let report = runner.run().await.unwrap();

        assert_eq!(report.executed(), 3);
        assert_eq!(executed_units(&store).await, vec!["a", "b", "c"]);
        assert!(store.snapshot(LOCK_COLLECTION).await.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let store = InMemoryStore::new();
        let unit = MockUnit::new("a", "001");
        let counter = unit.counter();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(unit));

        runner.run().await.unwrap();
        let ledger_before = store.snapshot(CHANGE_LOG_COLLECTION).await;
        let report = runner.run().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(report.executed(), 0);
        assert_eq!(report.skipped(), 1);
        assert_eq!(store.snapshot(CHANGE_LOG_COLLECTION).await, ledger_before);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let store = InMemoryStore::new();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("a", "001")));
        runner.register(Box::new(MockUnit::new("a", "002")));

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, MigrationError::InvalidChangeSetError { .. }));
        assert!(executed_units(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let store = InMemoryStore::new();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("", "001")));

        assert!(runner.plan().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_policy_halts_and_records_failure() {
        let store = InMemoryStore::new();
        let later = MockUnit::new("c", "003");
        let later_counter = later.counter();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("a", "001")));
        runner.register(Box::new(MockUnit::new("b", "002").failing()));
        runner.register(Box::new(later));

        let err = runner.run().await.unwrap_err();

        match &err {
            MigrationError::MigrationFailed { change_id, .. } => assert_eq!(change_id, "b"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(later_counter.load(Ordering::SeqCst), 0);

        let latest = ChangeLedger::new(&store).load().await.unwrap();
        assert_eq!(latest["a"].state, ChangeState::Executed);
        assert_eq!(latest["b"].state, ChangeState::Failed);
        assert_eq!(latest["b"].error.as_deref(), Some("Change 'b' failed: boom"));
        assert!(!latest.contains_key("c"));
        assert!(store.snapshot(LOCK_COLLECTION).await.is_empty());
    }

    #[tokio::test]
    async fn test_continue_policy_runs_remaining_units() {
        let store = InMemoryStore::new();
        let mut opts = options();
        opts.failure_policy = FailurePolicy::Continue;
        let mut runner = MigrationRunner::new(&store, opts);
        runner.register(Box::new(MockUnit::new("a", "001").failing()));
        runner.register(Box::new(MockUnit::new("b", "002")));

        let report = runner.run().await.unwrap();

        assert_eq!(report.executed(), 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].change_id, "a");
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_non_fail_fast_unit_does_not_stop_run() {
        let store = InMemoryStore::new();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("a", "001").failing().not_fail_fast()));
        runner.register(Box::new(MockUnit::new("b", "002")));

        let report = runner.run().await.unwrap();
        assert_eq!(report.executed(), 1);
        assert_eq!(report.count(ChangeOutcome::Failed), 1);
    }

    #[tokio::test]
    async fn test_failed_unit_is_retried_next_run() {
        let store = InMemoryStore::new();

        let mut first = MigrationRunner::new(&store, options());
        first.register(Box::new(MockUnit::new("a", "001").failing()));
        assert!(first.run().await.is_err());

        let mut second = MigrationRunner::new(&store, options());
        second.register(Box::new(MockUnit::new("a", "001")));
        let report = second.run().await.unwrap();

        assert_eq!(report.executed(), 1);
        let history = ChangeLedger::new(&store).history("a").await.unwrap();
        let states: Vec<ChangeState> = history.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![ChangeState::Failed, ChangeState::Executed]);
    }

    #[tokio::test]
    async fn test_rollback_is_recorded() {
        let store = InMemoryStore::new();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("a", "001").failing().with_rollback()));

        assert!(runner.run().await.is_err());

        assert!(executed_units(&store).await.is_empty());
        let latest = ChangeLedger::new(&store).load().await.unwrap();
        assert_eq!(latest["a"].state, ChangeState::RolledBack);
    }

    #[tokio::test]
    async fn test_modified_unit_fails_checksum_validation() {
        let store = InMemoryStore::new();

        let mut first = MigrationRunner::new(&store, options());
        first.register(Box::new(MockUnit::new("a", "001")));
        first.run().await.unwrap();

        let changed = MockUnit::new("a", "001").with_version(2);
        let counter = changed.counter();
        let mut second = MigrationRunner::new(&store, options());
        second.register(Box::new(changed));

        let err = second.run().await.unwrap_err();
        match err {
            MigrationError::MigrationFailed { source, .. } => {
                assert!(matches!(*source, MigrationError::ChecksumMismatchError { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_modified_unit_skipped_without_checksum_validation() {
        let store = InMemoryStore::new();

        let mut first = MigrationRunner::new(&store, options());
        first.register(Box::new(MockUnit::new("a", "001")));
        first.run().await.unwrap();

        let mut opts = options();
        opts.validate_checksums = false;
        let mut second = MigrationRunner::new(&store, opts);
        second.register(Box::new(MockUnit::new("a", "001").with_version(2)));

        let report = second.run().await.unwrap();
        assert_eq!(report.skipped(), 1);
    }

    #[tokio::test]
    async fn test_run_always_executes_every_time() {
        let store = InMemoryStore::new();
        let unit = MockUnit::new("a", "001").always();
        let counter = unit.counter();
        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(unit));

        runner.run().await.unwrap();
        runner.run().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_always_runs_changed_definition() {
        let store = InMemoryStore::new();
        let mut first = MigrationRunner::new(&store, options());
        first.register(Box::new(MockUnit::new("a", "001").always()));
        first.run().await.unwrap();

        let unit = MockUnit::new("a", "001").always().with_version(2);
        let counter = unit.counter();
        let mut second = MigrationRunner::new(&store, options());
        second.register(Box::new(unit));

        assert_eq!(second.status().await.unwrap()[0].status, ChangeStatus::Pending);

        let report = second.run().await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.count(ChangeOutcome::ChecksumMismatch), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // ledger 記錄新的 checksum
        let status = &second.status().await.unwrap()[0];
        assert_eq!(status.status, ChangeStatus::Applied);
        assert_eq!(
            status.last_entry.as_ref().unwrap().checksum,
            checksum_of(second.units[0].as_ref())
        );
    }

    #[tokio::test]
    async fn test_second_runner_with_same_execution_id_is_blocked() {
        let store = InMemoryStore::new();
        let blocked = Arc::new(AtomicBool::new(false));
        let lock_kept = Arc::new(AtomicBool::new(false));

        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(ConcurrentRunUnit {
            blocked: blocked.clone(),
            lock_kept: lock_kept.clone(),
        }));
        runner.run().await.unwrap();

        assert!(blocked.load(Ordering::SeqCst));
        assert!(lock_kept.load(Ordering::SeqCst));
        assert!(executed_units(&store).await.is_empty());
        assert!(store.snapshot(LOCK_COLLECTION).await.is_empty());
    }

    #[tokio::test]
    async fn test_lost_lease_stops_before_next_unit() {
        let store = InMemoryStore::new();
        let mut opts = options();
        opts.failure_policy = FailurePolicy::Continue;
        opts.lock.lease = Duration::ZERO;

        let next = MockUnit::new("next", "002");
        let counter = next.counter();
        let mut runner = MigrationRunner::new(&store, opts);
        runner.register(Box::new(TakeoverUnit));
        runner.register(Box::new(next));

        let err = runner.run().await.unwrap_err();
        match err {
            MigrationError::LockUnavailableError { owner } => {
                assert!(owner.starts_with("other-runner-"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // 新的持有者的鎖不會被釋放
        let locks = store.snapshot(LOCK_COLLECTION).await;
        assert_eq!(locks.len(), 1);
        assert!(locks[0]["owner"].as_str().unwrap().starts_with("other-runner-"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = InMemoryStore::new();
        let mut opts = options();
        opts.dry_run = true;
        let mut runner = MigrationRunner::new(&store, opts);
        runner.register(Box::new(MockUnit::new("a", "001")));

        let report = runner.run().await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.count(ChangeOutcome::Planned), 1);
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_blocked_by_foreign_lock() {
        let store = InMemoryStore::new();
        let other = MigrationLock::new(&store, "someone-else", LockSettings::default());
        other.acquire().await.unwrap();

        let mut runner = MigrationRunner::new(&store, options());
        runner.register(Box::new(MockUnit::new("a", "001")));

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, MigrationError::LockUnavailableError { .. }));
        assert!(executed_units(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_every_state() {
        let store = InMemoryStore::new();
        let mut opts = options();
        opts.failure_policy = FailurePolicy::Continue;

        let mut first = MigrationRunner::new(&store, opts.clone());
        first.register(Box::new(MockUnit::new("applied", "001")));
        first.register(Box::new(MockUnit::new("broken", "002").failing()));
        first.register(Box::new(MockUnit::new("changed", "003")));
        first.register(Box::new(MockUnit::new("removed", "004")));
        first.run().await.unwrap();

        let mut second = MigrationRunner::new(&store, opts);
        second.register(Box::new(MockUnit::new("applied", "001")));
        second.register(Box::new(MockUnit::new("broken", "002")));
        second.register(Box::new(MockUnit::new("changed", "003").with_version(9)));
        second.register(Box::new(MockUnit::new("new", "005")));

        let statuses: Vec<(String, ChangeStatus)> = second
            .status()
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.change_id, s.status))
            .collect();

        assert_eq!(
            statuses,
            vec![
                ("applied".to_string(), ChangeStatus::Applied),
                ("broken".to_string(), ChangeStatus::Failed),
                ("changed".to_string(), ChangeStatus::ChecksumMismatch),
                ("new".to_string(), ChangeStatus::Pending),
                ("removed".to_string(), ChangeStatus::Orphaned),
            ]
        );
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("stop".parse::<FailurePolicy>().unwrap(), FailurePolicy::Stop);
        assert_eq!("Continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
