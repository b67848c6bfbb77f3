//! Renders the handful of statements a table sync needs.
//!
//! Table and column names come from trusted configuration and are
//! interpolated as written, so the configured casing reaches the database
//! unchanged. Everything that varies per row is a positional placeholder.

use crate::query::{
    ast::expr::{BinaryOperator, Expr},
    builder::{insert::InsertBuilder, select::SelectBuilder, update::UpdateBuilder},
    dialect::Dialect,
    ident,
    renderer::{Render, Renderer},
};

pub struct SqlBuilder<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// `SELECT <columns> FROM <table>`, plus
    /// `WHERE <date> >= ? AND <date> < ?` when the window is active and a
    /// date column is given. The two bounds are the only parameters.
    pub fn select(
        &self,
        table: &str,
        columns: &[String],
        date_column: Option<&str>,
        window_active: bool,
    ) -> String {
        let mut select = SelectBuilder::new()
            .select(columns.iter().map(|c| ident(c)).collect())
            .from(table);

        if window_active && let Some(date) = date_column {
            select = select
                .where_clause(Expr::binary(
                    ident(date),
                    BinaryOperator::GtEq,
                    Expr::Placeholder,
                ))
                .where_clause(Expr::binary(ident(date), BinaryOperator::Lt, Expr::Placeholder));
        }

        self.render(select.build())
    }

    /// `INSERT INTO <table> (<cols>) VALUES (<one placeholder per column>)`.
    pub fn insert(&self, table: &str, target_columns: &[String]) -> String {
        let insert = InsertBuilder::new(table)
            .columns(target_columns)
            .placeholders()
            .build();
        self.render(insert)
    }

    /// `UPDATE <table> SET <col> = ?, ... WHERE <pk> = ?`; the key value is
    /// bound last. Returns `None` when there is nothing to set.
    pub fn update(&self, table: &str, set_columns: &[String], target_pk: &str) -> Option<String> {
        if set_columns.is_empty() {
            return None;
        }

        let update = set_columns
            .iter()
            .fold(UpdateBuilder::new(table), |builder, column| {
                builder.set(column, Expr::Placeholder)
            })
            .where_clause(Expr::binary(
                ident(target_pk),
                BinaryOperator::Eq,
                Expr::Placeholder,
            ))
            .build();

        Some(self.render(update))
    }

    /// `SELECT 1 FROM <table> WHERE <pk> = ?`.
    pub fn exists_check(&self, table: &str, target_pk: &str) -> String {
        let select = SelectBuilder::new()
            .select(vec![Expr::Literal("1".into())])
            .from(table)
            .where_clause(Expr::binary(
                ident(target_pk),
                BinaryOperator::Eq,
                Expr::Placeholder,
            ))
            .build();
        self.render(select)
    }

    /// Single-statement insert-or-update keyed on `target_pk`, bound like
    /// [`SqlBuilder::insert`].
    pub fn native_upsert(&self, table: &str, target_columns: &[String], target_pk: &str) -> String {
        let update: Vec<String> = target_columns
            .iter()
            .filter(|c| !c.eq_ignore_ascii_case(target_pk))
            .cloned()
            .collect();

        let insert = InsertBuilder::new(table)
            .columns(target_columns)
            .placeholders()
            .on_conflict_update(&[target_pk.to_string()], &update)
            .build();
        self.render(insert)
    }

    fn render<T: Render>(&self, ast: T) -> String {
        let mut renderer = Renderer::new(self.dialect);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();
        sql
    }
}
