//! Synchronizes one table mapping: fetch from the source, then write into
//! the target in fixed-size batches, one transaction per batch.

use crate::writer::BatchWriter;
use connectors::sql::base::{
    error::DbError,
    store::{SourceStore, TargetStore},
};
use engine_config::settings::{DEFAULT_BATCH_SIZE, UpsertStrategy};
use engine_core::{
    error::{SyncError, TableSyncError},
    metrics::Metrics,
    progress::ProgressScope,
};
use model::{
    core::value::Value,
    execution::errors::ConfigurationError,
    mapping::{
        config::{SyncWindow, TableMapping},
        correspondence::ColumnCorrespondence,
    },
    records::batch::partition,
};
use planner::plan::TablePlan;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct TableSyncEngine {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    batch_size: usize,
    strategy: UpsertStrategy,
    metrics: Metrics,
}

impl TableSyncEngine {
    pub fn new(source: Arc<dyn SourceStore>, target: Arc<dyn TargetStore>) -> Self {
        Self {
            source,
            target,
            batch_size: DEFAULT_BATCH_SIZE,
            strategy: UpsertStrategy::default(),
            metrics: Metrics::new(),
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

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Copies every source row of `mapping` (restricted to `window` when the
    /// mapping has a date column) into the target and returns the number of
    /// rows processed.
    ///
    /// Batches already committed stay committed when a later one fails.
    pub async fn sync_table(
        &self,
        mapping: &TableMapping,
        window: Option<&SyncWindow>,
        progress: &ProgressScope<'_>,
    ) -> Result<u64, SyncError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::InvalidBatchSize.into());
        }
        mapping.pk_columns()?;
        let columns = ColumnCorrespondence::resolve(mapping)?;

        let window = window.filter(|_| mapping.date_column().is_some());
        let plan = TablePlan::new(
            mapping,
            &columns,
            window.is_some(),
            self.source.dialect(),
            self.target.dialect(),
        );
        let params = match window {
            Some(w) => vec![
                Value::TimestampNaive(w.start_inclusive),
                Value::TimestampNaive(w.end_exclusive),
            ],
            None => Vec::new(),
        };

        debug!(sql = %plan.select, window = plan.window_active, "Fetching source rows");
        let rows = self
            .source
            .fetch_rows(&plan.select, &params)
            .await
            .map_err(|e| table_error(mapping, e))?;

        let total = rows.len() as u64;
        info!(
            source_table = %mapping.source_table,
            target_table = %mapping.target_table,
            rows = total,
            "Fetched source rows"
        );
        if rows.is_empty() {
            return Ok(0);
        }

        let writer = BatchWriter::new(&plan, &columns).with_strategy(self.strategy);
        let step = format!("sync {}", mapping.label());
        let mut processed = 0u64;

        for batch in partition(&rows, self.batch_size) {
            let mut tx = self
                .target
                .begin()
                .await
                .map_err(|e| table_error(mapping, e))?;

            let written = match writer.write_batch(tx.as_mut(), &batch).await {
                Ok(written) => written,
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(%rollback_err, batch = batch.index, "Rollback failed");
                    }
                    return Err(table_error(mapping, err));
                }
            };
            tx.commit().await.map_err(|e| table_error(mapping, e))?;

            processed += batch.len() as u64;
            self.metrics.add_batch(batch.len() as u64);
            info!(
                target_table = %mapping.target_table,
                batch = batch.index,
                rows = batch.len(),
                bytes = batch.size_bytes(),
                inserted = written.inserted,
                updated = written.updated,
                upserted = written.upserted,
                elapsed_ms = written.duration.as_millis() as u64,
                processed,
                total,
                "Batch committed"
            );

            progress
                .advance(
                    &step,
                    processed,
                    total,
                    format!("{processed}/{total} rows synced into {}", mapping.target_table),
                )
                .await;
        }

        Ok(processed)
    }
}

fn table_error(mapping: &TableMapping, cause: DbError) -> SyncError {
    TableSyncError {
        source_table: mapping.source_table.clone(),
        target_table: mapping.target_table.clone(),
        cause,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use connectors::test_utils::memory::{MemoryStore, StatementKind};
    use engine_core::{progress::ProgressRange, test_utils::RecordingReporter};
    use model::records::row::SourceRow;
    use tracing_test::traced_test;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn source_rows(ids: impl IntoIterator<Item = i64>) -> Vec<SourceRow> {
        ids.into_iter()
            .map(|id| {
                SourceRow::from_pairs([
                    ("id", Value::Int(id)),
                    ("name", Value::String(format!("row-{id}"))),
                    ("updated_at", Value::TimestampNaive(at(10))),
                ])
            })
            .collect()
    }

    fn target_rows(ids: impl IntoIterator<Item = i64>) -> Vec<SourceRow> {
        ids.into_iter()
            .map(|id| {
                SourceRow::from_pairs([
                    ("target_id", Value::Int(id)),
                    ("target_name", Value::from("stale")),
                ])
            })
            .collect()
    }

    fn mapping() -> TableMapping {
        TableMapping::new("source_data", "target_data", "id", "target_id")
            .with_column("name", "target_name")
    }

    struct Fixture {
        source: MemoryStore,
        target: MemoryStore,
        reporter: RecordingReporter,
    }

    impl Fixture {
        fn new(source_rows: Vec<SourceRow>, target_rows: Vec<SourceRow>) -> Self {
            Fixture {
                source: MemoryStore::default().with_table("source_data", source_rows),
                target: MemoryStore::default().with_table("target_data", target_rows),
                reporter: RecordingReporter::new(),
            }
        }

        fn engine(&self) -> TableSyncEngine {
            TableSyncEngine::new(Arc::new(self.source.clone()), Arc::new(self.target.clone()))
        }

        async fn sync(
            &self,
            engine: &TableSyncEngine,
            mapping: &TableMapping,
            window: Option<&SyncWindow>,
        ) -> Result<u64, SyncError> {
            let scope = ProgressScope::new(&self.reporter, 1, ProgressRange::for_table(0, 1));
            engine.sync_table(mapping, window, &scope).await
        }
    }

    #[tokio::test]
    async fn missing_pk_column_fails_before_any_query() {
        let fx = Fixture::new(source_rows(1..=3), vec![]);
        let mut bad = mapping();
        bad.target_pk_column = Some("  ".into());

        let err = fx.sync(&fx.engine(), &bad, None).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Configuration(ConfigurationError::MissingPkColumn { side: "target", .. })
        ));
        assert!(fx.source.executed().is_empty());
        assert!(fx.target.executed().is_empty());
    }

    #[tokio::test]
    async fn zero_rows_opens_no_transaction() {
        let fx = Fixture::new(vec![], vec![]);

        let processed = fx.sync(&fx.engine(), &mapping(), None).await.unwrap();

        assert_eq!(processed, 0);
        assert!(fx.target.executed().is_empty());
        assert!(fx.target.commits().is_empty());
        assert!(fx.reporter.progress().is_empty());
    }

    #[traced_test]
    #[tokio::test]
    async fn commits_one_transaction_per_batch() {
        let fx = Fixture::new(source_rows(1..=250), vec![]);

        let processed = fx.sync(&fx.engine(), &mapping(), None).await.unwrap();

        assert_eq!(processed, 250);
        assert_eq!(fx.target.commits(), vec![100, 100, 50]);
        assert_eq!(fx.target.rows("target_data").len(), 250);
        assert_eq!(fx.reporter.percents(), vec![42, 74, 90]);
        assert!(logs_contain("Batch committed"));
        assert!(logs_contain("bytes="));
    }

    #[tokio::test]
    async fn batch_size_is_configurable_and_must_be_positive() {
        let fx = Fixture::new(source_rows(1..=5), vec![]);

        fx.sync(&fx.engine().with_batch_size(2), &mapping(), None)
            .await
            .unwrap();
        assert_eq!(fx.target.commits(), vec![2, 2, 1]);

        let err = fx
            .sync(&fx.engine().with_batch_size(0), &mapping(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Configuration(ConfigurationError::InvalidBatchSize)
        ));
    }

    #[tokio::test]
    async fn existing_rows_are_updated_and_new_rows_inserted() {
        let fx = Fixture::new(source_rows(1..=5), target_rows([2, 4]));

        let processed = fx.sync(&fx.engine(), &mapping(), None).await.unwrap();

        assert_eq!(processed, 5);
        assert_eq!(fx.target.count(StatementKind::Update), 2);
        assert_eq!(fx.target.count(StatementKind::Insert), 3);
        let rows = fx.target.rows("target_data");
        assert_eq!(rows.len(), 5);
        assert!(
            rows.iter()
                .all(|r| r.get_value("target_name") != Value::from("stale"))
        );
    }

    #[tokio::test]
    async fn second_run_only_updates() {
        let fx = Fixture::new(source_rows(1..=7), vec![]);
        let engine = fx.engine();

        fx.sync(&engine, &mapping(), None).await.unwrap();
        let inserts_after_first = fx.target.count(StatementKind::Insert);
        let second = fx.sync(&engine, &mapping(), None).await.unwrap();

        assert_eq!(second, 7);
        assert_eq!(fx.target.count(StatementKind::Insert), inserts_after_first);
        assert_eq!(fx.target.count(StatementKind::Update), 7);
        assert_eq!(fx.target.rows("target_data").len(), 7);
    }

    #[tokio::test]
    async fn window_includes_start_and_excludes_end() {
        let rows = [(1, at(1)), (2, at(2)), (3, at(3))]
            .into_iter()
            .map(|(id, ts)| {
                SourceRow::from_pairs([
                    ("id", Value::Int(id)),
                    ("name", Value::from("x")),
                    ("updated_at", Value::TimestampNaive(ts)),
                ])
            })
            .collect();
        let fx = Fixture::new(rows, vec![]);
        let window = SyncWindow {
            start_inclusive: at(1),
            end_exclusive: at(3),
        };

        let processed = fx
            .sync(
                &fx.engine(),
                &mapping().with_date_column("updated_at"),
                Some(&window),
            )
            .await
            .unwrap();

        assert_eq!(processed, 2);
        let select = &fx.source.executed()[0];
        assert!(select.sql.ends_with("WHERE updated_at >= $1 AND updated_at < $2"));
        assert_eq!(select.params.len(), 2);
    }

    #[tokio::test]
    async fn window_is_ignored_without_a_date_column() {
        let fx = Fixture::new(source_rows(1..=3), vec![]);
        let window = SyncWindow {
            start_inclusive: at(20),
            end_exclusive: at(21),
        };

        let processed = fx
            .sync(&fx.engine(), &mapping(), Some(&window))
            .await
            .unwrap();

        assert_eq!(processed, 3);
        assert!(fx.source.executed()[0].params.is_empty());
    }

    #[tokio::test]
    async fn failure_rolls_back_the_open_batch_only() {
        let fx = Fixture::new(source_rows(1..=150), vec![]);
        let target = fx.target.clone().fail_after(StatementKind::Insert, "target_data", 120);
        let engine = TableSyncEngine::new(Arc::new(fx.source.clone()), Arc::new(target));

        let err = fx.sync(&engine, &mapping(), None).await.unwrap_err();

        let SyncError::TableSync(err) = err else {
            panic!("expected a table sync error, got {err:?}");
        };
        assert_eq!(err.source_table, "source_data");
        assert_eq!(err.target_table, "target_data");
        assert_eq!(fx.target.commits(), vec![100]);
        assert_eq!(fx.target.rollbacks(), 1);
        assert_eq!(fx.target.rows("target_data").len(), 100);
    }

    #[tokio::test]
    async fn fetch_failure_is_table_scoped() {
        let fx = Fixture::new(source_rows(1..=3), vec![]);
        let source = fx.source.clone().fail_on(StatementKind::Select, "source_data");
        let engine = TableSyncEngine::new(Arc::new(source), Arc::new(fx.target.clone()));

        let err = fx.sync(&engine, &mapping(), None).await.unwrap_err();

        assert!(err.is_table_scoped());
        assert!(fx.target.executed().is_empty());
    }

    #[tokio::test]
    async fn native_strategy_keeps_batching() {
        let fx = Fixture::new(source_rows(1..=150), target_rows([1]));

        let processed = fx
            .sync(
                &fx.engine().with_strategy(UpsertStrategy::Native),
                &mapping(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(processed, 150);
        assert_eq!(fx.target.commits(), vec![100, 50]);
        assert_eq!(fx.target.count(StatementKind::Upsert), 150);
        assert_eq!(fx.target.rows("target_data").len(), 150);
    }
}
