//! The two sides of a sync, as seen by the engine.
//!
//! A source is only ever read. A target is only written inside a
//! [`TargetTransaction`], one per batch. The two are independent
//! connections: nothing assumes they share a server, schema or transaction.

use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{core::value::Value, records::row::SourceRow};
use planner::query::dialect::{self, Dialect, DialectKind};

#[async_trait]
pub trait SourceStore: Send + Sync {
    fn kind(&self) -> DialectKind;

    fn dialect(&self) -> &'static dyn Dialect {
        dialect::for_kind(self.kind())
    }

    /// Runs `sql` with `params` bound positionally and materializes every
    /// row, in result order.
    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<SourceRow>, DbError>;
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    fn kind(&self) -> DialectKind;

    fn dialect(&self) -> &'static dyn Dialect {
        dialect::for_kind(self.kind())
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn TargetTransaction + 'a>, DbError>;
}

/// An open write transaction. It must be finished with `commit` or
/// `rollback`; dropping it unfinished rolls it back.
#[async_trait]
pub trait TargetTransaction: Send {
    /// Runs an existence query; true when it yields at least one row.
    async fn exists(&mut self, sql: &str, params: &[Value]) -> Result<bool, DbError>;

    /// Runs a write statement and returns the affected row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
