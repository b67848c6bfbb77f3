use crate::query::{dialect::Dialect, generator::SqlBuilder};
use model::mapping::{config::TableMapping, correspondence::ColumnCorrespondence};
use serde::Serialize;

/// Every statement one table sync executes, rendered once up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePlan {
    /// Read side, in the source dialect.
    pub select: String,
    pub window_active: bool,
    pub exists: String,
    pub insert: String,
    /// Absent when the key is the only mapped column.
    pub update: Option<String>,
    pub upsert: String,
}

impl TablePlan {
    pub fn new(
        mapping: &TableMapping,
        columns: &ColumnCorrespondence,
        window_active: bool,
        source: &dyn Dialect,
        target: &dyn Dialect,
    ) -> Self {
        let read = SqlBuilder::new(source);
        let write = SqlBuilder::new(target);

        let target_pk = columns.key().target.as_str();
        let target_columns = columns.target_columns();
        let set_columns: Vec<String> = columns.updatable().map(|p| p.target.clone()).collect();

        TablePlan {
            select: read.select(
                &mapping.source_table,
                &columns.source_columns(),
                mapping.date_column(),
                window_active,
            ),
            window_active: window_active && mapping.date_column().is_some(),
            exists: write.exists_check(&mapping.target_table, target_pk),
            insert: write.insert(&mapping.target_table, &target_columns),
            update: write.update(&mapping.target_table, &set_columns, target_pk),
            upsert: write.native_upsert(&mapping.target_table, &target_columns, target_pk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::dialect::{MySql, Postgres};

    #[test]
    fn renders_read_and_write_sides_in_their_own_dialects() {
        let mapping = TableMapping::new("source_data", "target_data", "id", "sync_id")
            .with_date_column("updated_at")
            .with_column("name", "target_name");
        let columns = ColumnCorrespondence::resolve(&mapping).unwrap();

        let plan = TablePlan::new(&mapping, &columns, true, &MySql, &Postgres);

        assert_eq!(
            plan.select,
            "SELECT id, name FROM source_data WHERE updated_at >= ? AND updated_at < ?"
        );
        assert!(plan.window_active);
        assert_eq!(plan.exists, "SELECT 1 FROM target_data WHERE sync_id = $1");
        assert_eq!(
            plan.insert,
            "INSERT INTO target_data (sync_id, target_name) VALUES ($1, $2)"
        );
        assert_eq!(
            plan.update.as_deref(),
            Some("UPDATE target_data SET target_name = $1 WHERE sync_id = $2")
        );
    }

    #[test]
    fn key_only_mapping_has_no_update() {
        let mapping = TableMapping::new("a", "b", "id", "id");
        let columns = ColumnCorrespondence::resolve(&mapping).unwrap();
        let plan = TablePlan::new(&mapping, &columns, false, &Postgres, &Postgres);
        assert_eq!(plan.update, None);
        assert!(!plan.window_active);
    }

    #[test]
    fn both_write_strategies_set_the_same_columns() {
        let mapping = TableMapping::new("a", "b", "id", "sync_id")
            .with_column("name", "target_name")
            .with_column("legacy_id", "SYNC_ID");
        let columns = ColumnCorrespondence::resolve(&mapping).unwrap();

        let plan = TablePlan::new(&mapping, &columns, false, &Postgres, &Postgres);

        assert_eq!(
            plan.update.as_deref(),
            Some("UPDATE b SET target_name = $1 WHERE sync_id = $2")
        );
        assert_eq!(
            plan.upsert,
            "INSERT INTO b (sync_id, target_name, SYNC_ID) VALUES ($1, $2, $3) \
             ON CONFLICT (sync_id) DO UPDATE SET target_name = EXCLUDED.target_name"
        );
    }

    #[test]
    fn key_target_alone_leaves_nothing_to_update() {
        let mapping =
            TableMapping::new("a", "b", "id", "sync_id").with_column("legacy_id", "sync_id");
        let columns = ColumnCorrespondence::resolve(&mapping).unwrap();
        let plan = TablePlan::new(&mapping, &columns, false, &Postgres, &Postgres);
        assert_eq!(plan.update, None);
    }
}
