use crate::query::ast::{
    expr::Expr,
    insert::{ConflictAction, Insert, OnConflict},
};

#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    ast: Insert,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            ast: Insert {
                table: table.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn columns(mut self, columns: &[String]) -> Self {
        self.ast.columns = columns.to_vec();
        self
    }

    pub fn values(mut self, row: Vec<Expr>) -> Self {
        self.ast.values.push(row);
        self
    }

    /// One placeholder per column, for statements prepared once and bound per row.
    pub fn placeholders(self) -> Self {
        let row = vec![Expr::Placeholder; self.ast.columns.len()];
        self.values(row)
    }

    pub fn on_conflict_update(mut self, key_columns: &[String], update: &[String]) -> Self {
        let action = if update.is_empty() {
            ConflictAction::DoNothing
        } else {
            ConflictAction::DoUpdate {
                columns: update.to_vec(),
            }
        };
        self.ast.on_conflict = Some(OnConflict {
            columns: key_columns.to_vec(),
            action,
        });
        self
    }

    pub fn build(self) -> Insert {
        self.ast
    }
}
