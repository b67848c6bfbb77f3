use crate::query::ast::{expr::Expr, select::Select};

#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    ast: Select,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: Vec<Expr>) -> Self {
        self.ast.columns = columns;
        self
    }

    pub fn from(mut self, table: &str) -> Self {
        self.ast.from = table.to_string();
        self
    }

    /// Adds a condition, AND-ing it with any condition already present.
    pub fn where_clause(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(match self.ast.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}
