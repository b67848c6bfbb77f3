//! Drives one synchronization run from validation to the final completion
//! report.

use connectors::adapter::StoreConnector;
use engine_config::settings::{DEFAULT_BATCH_SIZE, UpsertStrategy};
use engine_core::{
    error::SyncError,
    metrics::Metrics,
    progress::{DONE_PERCENT, ProgressRange, ProgressReporter, ProgressScope, START_PERCENT},
};
use engine_processing::table_sync::TableSyncEngine;
use futures::FutureExt;
use model::{
    events::{CompletionEvent, LogLevel, ProgressEvent},
    execution::result::{RunResult, TableOutcome},
    mapping::config::{MappingConfig, TableMapping},
};
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Instant};
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct RunTally {
    processed: u64,
    errors: u64,
    tables: Vec<TableOutcome>,
}

pub struct SyncOrchestrator {
    connector: Arc<dyn StoreConnector>,
    reporter: Arc<dyn ProgressReporter>,
    batch_size: usize,
    strategy: UpsertStrategy,
}

impl SyncOrchestrator {
    pub fn new(connector: Arc<dyn StoreConnector>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            connector,
            reporter,
            batch_size: DEFAULT_BATCH_SIZE,
            strategy: UpsertStrategy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Runs every table mapping of `config` in order and reports the outcome.
    ///
    /// Never fails: a failing table is counted and skipped, while a run-level
    /// failure (empty config, unreachable store, panic) ends the run with
    /// `success = false`. Either way exactly one completion report is sent.
    pub async fn execute_sync(&self, exec_id: i64, config: &MappingConfig) -> RunResult {
        let started = Instant::now();
        let mut tally = RunTally::default();
        info!(exec_id, tables = config.table_mappings.len(), "Sync run started");

        let outcome = AssertUnwindSafe(self.run(exec_id, config, &mut tally))
            .catch_unwind()
            .await;
        let error_message = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(panic) => Some(format!("sync run panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(message) = &error_message {
            error!(exec_id, error = %message, "Sync run aborted");
            self.report(exec_id, "error", None, message.clone(), LogLevel::Error)
                .await;
        }

        let success = error_message.is_none();
        let result_message = if success {
            format!(
                "Sync completed: processed {} rows, {} table mapping(s) failed",
                tally.processed, tally.errors
            )
        } else {
            "Sync failed".to_string()
        };
        let elapsed_millis = started.elapsed().as_millis() as u64;

        self.reporter
            .report_complete(CompletionEvent {
                exec_id,
                success,
                processed_count: tally.processed,
                error_count: tally.errors,
                result_message: result_message.clone(),
                error_message: error_message.clone(),
                elapsed_millis,
            })
            .await;

        info!(
            exec_id,
            success,
            processed = tally.processed,
            errors = tally.errors,
            elapsed_ms = elapsed_millis,
            "Sync run finished"
        );

        RunResult {
            exec_id,
            success,
            processed_count: tally.processed,
            error_count: tally.errors,
            result_message,
            error_message,
            elapsed_millis,
            tables: tally.tables,
        }
    }

    async fn run(
        &self,
        exec_id: i64,
        config: &MappingConfig,
        tally: &mut RunTally,
    ) -> Result<(), SyncError> {
        config.validate()?;

        let source = self.connector.open_source().await?;
        let target = self.connector.open_target().await?;

        let count = config.table_mappings.len();
        self.report(
            exec_id,
            "start",
            Some(START_PERCENT),
            format!("Starting sync of {count} table mapping(s)"),
            LogLevel::Info,
        )
        .await;

        let metrics = Metrics::new();
        let engine = TableSyncEngine::new(source, target)
            .with_batch_size(self.batch_size)
            .with_strategy(self.strategy)
            .with_metrics(metrics.clone());
        let window = config.sync_window();

        for (index, mapping) in config.table_mappings.iter().enumerate() {
            let range = ProgressRange::for_table(index, count);
            let scope = ProgressScope::new(self.reporter.as_ref(), exec_id, range);
            let label = mapping.label();

            info!(
                exec_id,
                source_table = %mapping.source_table,
                target_table = %mapping.target_table,
                table = index + 1,
                of = count,
                "Syncing table mapping"
            );
            self.report(
                exec_id,
                &format!("sync {label}"),
                Some(range.start_percent()),
                format!("Syncing table mapping {}/{count}: {label}", index + 1),
                LogLevel::Info,
            )
            .await;

            match engine.sync_table(mapping, window.as_ref(), &scope).await {
                Ok(rows) => {
                    tally.processed += rows;
                    metrics.table_synced();
                    tally.tables.push(outcome(mapping, rows, None));
                }
                Err(err) if err.is_table_scoped() => {
                    warn!(
                        exec_id,
                        source_table = %mapping.source_table,
                        target_table = %mapping.target_table,
                        error = %err,
                        "Table mapping failed, continuing with the next one"
                    );
                    tally.errors += 1;
                    metrics.table_failed();
                    self.report(
                        exec_id,
                        &format!("sync {label}"),
                        None,
                        err.to_string(),
                        LogLevel::Error,
                    )
                    .await;
                    tally.tables.push(outcome(mapping, 0, Some(err.to_string())));
                }
                Err(err) => return Err(err),
            }
        }

        self.reporter
            .report_progress(ProgressEvent {
                exec_id,
                step: "complete".to_string(),
                percent: Some(DONE_PERCENT),
                processed_count: Some(tally.processed),
                total_count: Some(tally.processed),
                message: format!("Sync finished: {} rows processed", tally.processed),
                level: LogLevel::Info,
            })
            .await;

        let snapshot = metrics.snapshot();
        info!(
            exec_id,
            rows = snapshot.rows_processed,
            batches = snapshot.batches_committed,
            tables_synced = snapshot.tables_synced,
            tables_failed = snapshot.tables_failed,
            "All table mappings processed"
        );
        Ok(())
    }

    async fn report(
        &self,
        exec_id: i64,
        step: &str,
        percent: Option<u8>,
        message: String,
        level: LogLevel,
    ) {
        self.reporter
            .report_progress(ProgressEvent {
                exec_id,
                step: step.to_string(),
                percent,
                processed_count: None,
                total_count: None,
                message,
                level,
            })
            .await;
    }
}

fn outcome(mapping: &TableMapping, processed_count: u64, error: Option<String>) -> TableOutcome {
    TableOutcome {
        source_table: mapping.source_table.clone(),
        target_table: mapping.target_table.clone(),
        processed_count,
        error,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
