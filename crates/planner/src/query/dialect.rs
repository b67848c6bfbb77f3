//! Defines the `Dialect` trait for database-specific SQL syntax.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialectKind {
    Postgres,
    MySql,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectKind::Postgres => f.write_str("PostgreSQL"),
            DialectKind::MySql => f.write_str("MySQL"),
        }
    }
}

pub trait Dialect: Send + Sync {
    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String {
        self.kind().to_string()
    }

    fn kind(&self) -> DialectKind;

    /// Opens the conflict clause of an atomic upsert keyed on `key_columns`.
    ///
    /// - PostgreSQL: ` ON CONFLICT (id) DO UPDATE SET `
    /// - MySQL: ` ON DUPLICATE KEY UPDATE `
    fn upsert_clause(&self, key_columns: &[String]) -> String;

    /// Expression that refers to the value proposed for `column` by the
    /// conflicting insert.
    fn excluded_value(&self, column: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn get_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn upsert_clause(&self, key_columns: &[String]) -> String {
        format!(" ON CONFLICT ({}) DO UPDATE SET ", key_columns.join(", "))
    }

    fn excluded_value(&self, column: &str) -> String {
        format!("EXCLUDED.{column}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn upsert_clause(&self, _key_columns: &[String]) -> String {
        // MySQL resolves the conflicting key from the table's unique indexes.
        " ON DUPLICATE KEY UPDATE ".into()
    }

    fn excluded_value(&self, column: &str) -> String {
        format!("VALUES({column})")
    }
}

pub fn for_kind(kind: DialectKind) -> &'static dyn Dialect {
    match kind {
        DialectKind::Postgres => &Postgres,
        DialectKind::MySql => &MySql,
    }
}
