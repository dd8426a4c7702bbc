use crate::core::runner::MigrationRunner;
use crate::domain::model::MigrationReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct MigrationEngine<'a> {
    runner: MigrationRunner<'a>,
    monitor: SystemMonitor,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(runner: MigrationRunner<'a>) -> Self {
        Self::new_with_monitoring(runner, false)
    }

    pub fn new_with_monitoring(runner: MigrationRunner<'a>, monitor_enabled: bool) -> Self {
        Self {
            runner,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn runner(&self) -> &MigrationRunner<'a> {
        &self.runner
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        tracing::info!(
            "Starting migration ({} change units registered)",
            self.runner.len()
        );
        self.monitor.log_phase("Migration started");

        let result = self.runner.run().await;

        self.monitor.log_phase("Migration completed");
        let report = result?;
        self.monitor.log_summary(report.executed());

        tracing::info!("📋 Summary: {}", report.summary());
        Ok(report)
    }
}
