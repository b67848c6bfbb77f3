use connectors::sql::base::{error::DbError, store::TargetTransaction};
use engine_config::settings::UpsertStrategy;
use model::{
    core::value::Value,
    mapping::correspondence::ColumnCorrespondence,
    records::{batch::Batch, row::SourceRow},
};
use planner::plan::TablePlan;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub rows_written: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Rows that already existed and had no non-key column to update.
    pub unchanged: usize,
    pub upserted: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowWrite {
    Inserted,
    Updated,
    Unchanged,
    Upserted,
}

/// Writes batches of source rows into the target table of one plan.
pub struct BatchWriter<'a> {
    plan: &'a TablePlan,
    columns: &'a ColumnCorrespondence,
    strategy: UpsertStrategy,
}

impl<'a> BatchWriter<'a> {
    pub fn new(plan: &'a TablePlan, columns: &'a ColumnCorrespondence) -> Self {
        Self {
            plan,
            columns,
            strategy: UpsertStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Writes every row of `batch`, in order, inside `tx`. Stops at the
    /// first failing statement; the caller owns commit and rollback.
    pub async fn write_batch(
        &self,
        tx: &mut (dyn TargetTransaction + '_),
        batch: &Batch<'_>,
    ) -> Result<WriteResult, DbError> {
        let start = Instant::now();
        let mut result = WriteResult::default();

        for row in batch.rows {
            match self.write_row(tx, row).await? {
                RowWrite::Inserted => result.inserted += 1,
                RowWrite::Updated => result.updated += 1,
                RowWrite::Unchanged => result.unchanged += 1,
                RowWrite::Upserted => result.upserted += 1,
            }
            result.rows_written += 1;
        }

        result.duration = start.elapsed();
        Ok(result)
    }

    async fn write_row(
        &self,
        tx: &mut (dyn TargetTransaction + '_),
        row: &SourceRow,
    ) -> Result<RowWrite, DbError> {
        if self.strategy == UpsertStrategy::Native {
            tx.execute(&self.plan.upsert, &self.values(row)).await?;
            return Ok(RowWrite::Upserted);
        }

        let key = row.get_value(&self.columns.key().source);
        trace!(key = %key, "Checking target row");

        if tx.exists(&self.plan.exists, std::slice::from_ref(&key)).await? {
            let Some(update) = &self.plan.update else {
                return Ok(RowWrite::Unchanged);
            };
            let mut params: Vec<Value> = self
                .columns
                .updatable()
                .map(|pair| row.get_value(&pair.source))
                .collect();
            params.push(key);
            tx.execute(update, &params).await?;
            Ok(RowWrite::Updated)
        } else {
            tx.execute(&self.plan.insert, &self.values(row)).await?;
            Ok(RowWrite::Inserted)
        }
    }

    /// Row values in correspondence order, key first. Columns the row
    /// lacks are bound as null.
    fn values(&self, row: &SourceRow) -> Vec<Value> {
        self.columns
            .pairs()
            .iter()
            .map(|pair| row.get_value(&pair.source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{
        sql::base::store::TargetStore,
        test_utils::memory::{MemoryStore, StatementKind},
    };
    use model::{mapping::config::TableMapping, records::batch::partition};
    use planner::query::dialect::Postgres;

    fn setup(mapping: &TableMapping) -> (TablePlan, ColumnCorrespondence) {
        let columns = ColumnCorrespondence::resolve(mapping).unwrap();
        let plan = TablePlan::new(mapping, &columns, false, &Postgres, &Postgres);
        (plan, columns)
    }

    fn row(id: i64, name: &str) -> SourceRow {
        SourceRow::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
    }

    #[tokio::test]
    async fn updates_existing_and_inserts_new_rows() {
        let mapping = TableMapping::new("src", "dst", "id", "tid").with_column("name", "tname");
        let (plan, columns) = setup(&mapping);
        let target = MemoryStore::default().with_table(
            "dst",
            vec![SourceRow::from_pairs([
                ("tid", Value::Int(1)),
                ("tname", Value::from("old")),
            ])],
        );
        let rows = vec![row(1, "new"), row(2, "fresh")];

        let mut tx = target.begin().await.unwrap();
        let batch = partition(&rows, 100).next().unwrap();
        let result = BatchWriter::new(&plan, &columns)
            .write_batch(tx.as_mut(), &batch)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!((result.updated, result.inserted, result.rows_written), (1, 1, 2));
        let update = target
            .executed()
            .into_iter()
            .find(|e| e.kind == StatementKind::Update)
            .unwrap();
        assert_eq!(update.params, vec![Value::from("new"), Value::Int(1)]);
        assert_eq!(target.rows("dst").len(), 2);
    }

    #[tokio::test]
    async fn update_skips_pairs_that_target_the_key() {
        let mapping = TableMapping::new("src", "dst", "id", "tid")
            .with_column("name", "tname")
            .with_column("code", "TID");
        let (plan, columns) = setup(&mapping);
        let target = MemoryStore::default().with_table(
            "dst",
            vec![SourceRow::from_pairs([
                ("tid", Value::Int(1)),
                ("tname", Value::from("old")),
            ])],
        );
        let rows = vec![SourceRow::from_pairs([
            ("id", Value::Int(1)),
            ("name", Value::from("new")),
            ("code", Value::Int(9)),
        ])];

        let mut tx = target.begin().await.unwrap();
        let batch = partition(&rows, 100).next().unwrap();
        let result = BatchWriter::new(&plan, &columns)
            .write_batch(tx.as_mut(), &batch)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(result.updated, 1);
        let update = target
            .executed()
            .into_iter()
            .find(|e| e.kind == StatementKind::Update)
            .unwrap();
        assert_eq!(update.params, vec![Value::from("new"), Value::Int(1)]);
    }

    #[tokio::test]
    async fn key_only_mapping_leaves_existing_rows_alone() {
        let mapping = TableMapping::new("src", "dst", "id", "id");
        let (plan, columns) = setup(&mapping);
        let target =
            MemoryStore::default().with_table("dst", vec![SourceRow::from_pairs([("id", 1_i64)])]);
        let rows = vec![SourceRow::from_pairs([("id", 1_i64)])];

        let mut tx = target.begin().await.unwrap();
        let batch = partition(&rows, 100).next().unwrap();
        let result = BatchWriter::new(&plan, &columns)
            .write_batch(tx.as_mut(), &batch)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(result.unchanged, 1);
        assert_eq!(target.count(StatementKind::Update), 0);
        assert_eq!(target.count(StatementKind::Insert), 0);
    }

    #[tokio::test]
    async fn native_strategy_issues_one_statement_per_row() {
        let mapping = TableMapping::new("src", "dst", "id", "id").with_column("name", "name");
        let (plan, columns) = setup(&mapping);
        let target = MemoryStore::default().with_table("dst", vec![row(1, "old")]);
        let rows = vec![row(1, "new"), row(2, "b")];

        let mut tx = target.begin().await.unwrap();
        let batch = partition(&rows, 100).next().unwrap();
        let result = BatchWriter::new(&plan, &columns)
            .with_strategy(UpsertStrategy::Native)
            .write_batch(tx.as_mut(), &batch)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(result.upserted, 2);
        assert_eq!(target.count(StatementKind::Exists), 0);
        assert_eq!(target.count(StatementKind::Upsert), 2);
        assert_eq!(target.rows("dst")[0].get_value("name"), Value::from("new"));
    }

    #[tokio::test]
    async fn missing_source_column_is_written_as_null() {
        let mapping = TableMapping::new("src", "dst", "id", "id").with_column("absent", "extra");
        let (plan, columns) = setup(&mapping);
        let target = MemoryStore::default().with_table("dst", vec![]);
        let rows = vec![SourceRow::from_pairs([("id", 5_i64)])];

        let mut tx = target.begin().await.unwrap();
        let batch = partition(&rows, 100).next().unwrap();
        BatchWriter::new(&plan, &columns)
            .write_batch(tx.as_mut(), &batch)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(target.rows("dst")[0].get_value("extra"), Value::Null);
    }
}
