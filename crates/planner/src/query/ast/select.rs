//! Defines the Abstract Syntax Tree (AST) for a SELECT query.

use crate::query::ast::expr::Expr;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Select {
    /// The list of columns or expressions to be returned.
    /// e.g., `id`, `name`, `1`
    pub columns: Vec<Expr>,

    /// The table the rows are read from.
    pub from: String,

    /// The WHERE clause condition.
    pub where_clause: Option<Expr>,
}
