use crate::query::ast::expr::Expr;

pub mod ast;
pub mod builder;
pub mod dialect;
pub mod generator;
pub mod renderer;

pub fn ident(name: &str) -> Expr {
    Expr::Identifier(name.to_string())
}
