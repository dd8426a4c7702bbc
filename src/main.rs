use clap::Parser;
use reference_migrator::domain::model::{ChangeStatus, MigrationReport};
use reference_migrator::utils::error::{ErrorSeverity, MigrationError};
use reference_migrator::utils::{logger, validation::Validate};
use reference_migrator::{open_store, CliConfig, MigrationEngine, MigrationRunner};

fn print_report(report: &MigrationReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("Migration {}{}", report.execution_id, mode);
    for result in &report.results {
        match &result.error {
            Some(error) => println!("  {:<45} {:?}: {}", result.change_id, result.outcome, error),
            None => println!("  {:<45} {:?}", result.change_id, result.outcome),
        }
    }
    println!(
        "✅ {} executed, {} skipped, {} failed in {:?}",
        report.executed(),
        report.skipped(),
        report.failures().len(),
        report.duration
    );
}

fn exit_code(e: &MigrationError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &MigrationError) -> ! {
    tracing::error!(
        "❌ Migration failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting reference-migrate");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match cli.load_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let mut options = match config.runner_options() {
        Ok(options) => options,
        Err(e) => fail(&e),
    };
    options.dry_run = cli.dry_run;

    let store = match open_store(&config.store.uri).await {
        Ok(store) => store,
        Err(e) => fail(&e),
    };

    let mut runner = MigrationRunner::new(store.as_ref(), options);
    runner.register_all(config.change_units());

    if cli.status {
        let statuses = match runner.status().await {
            Ok(statuses) => statuses,
            Err(e) => fail(&e),
        };
        for entry in &statuses {
            let executed_at = entry
                .last_entry
                .as_ref()
                .map(|e| e.executed_at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<45} {:<18} {}",
                entry.change_id,
                format!("{:?}", entry.status),
                executed_at
            );
        }
        let pending = statuses
            .iter()
            .filter(|s| s.status == ChangeStatus::Pending)
            .count();
        println!("{} change units, {} pending", statuses.len(), pending);
        return Ok(());
    }

    let engine = MigrationEngine::new_with_monitoring(runner, cli.monitor);
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match engine.run().await {
        Ok(report) => {
            print_report(&report);
            if !report.is_success() {
                // continue 模式下仍有失敗的 unit
                std::process::exit(1);
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
