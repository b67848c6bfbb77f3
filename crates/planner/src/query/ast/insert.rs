//! Defines the AST for an INSERT statement.

use crate::query::ast::expr::Expr;

/// Represents a complete INSERT statement.
///
/// This structure supports both single-row and multi-row (batch) inserts
/// through the `values` field, which is a list of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    /// The rows of values to be inserted. Each inner vector represents a single row.
    pub values: Vec<Vec<Expr>>,
    /// Optional conflict handling, turning the insert into an upsert.
    pub on_conflict: Option<OnConflict>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    pub columns: Vec<String>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    DoNothing,
    /// Overwrite the listed columns with the values of the rejected row.
    DoUpdate { columns: Vec<String> },
}
