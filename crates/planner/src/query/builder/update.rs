use crate::query::ast::{
    expr::Expr,
    update::{Assignment, Update},
};

#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    ast: Update,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            ast: Update {
                table: table.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn set(mut self, column: &str, value: Expr) -> Self {
        self.ast.assignments.push(Assignment {
            column: column.to_string(),
            value,
        });
        self
    }

    pub fn where_clause(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(condition);
        self
    }

    pub fn build(self) -> Update {
        self.ast
    }
}
