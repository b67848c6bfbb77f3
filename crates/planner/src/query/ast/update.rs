//! Defines the AST for an UPDATE statement.

use crate::query::ast::expr::Expr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}
