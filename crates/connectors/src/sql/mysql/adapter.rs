use crate::sql::{
    base::{
        error::{ConnectorError, DbError},
        row::DbRow,
        store::{SourceStore, TargetStore, TargetTransaction},
    },
    mysql::params::MySqlParamStore,
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::SourceRow};
use mysql_async::{Opts, Pool, Row, TxOpts, prelude::Queryable};
use planner::query::dialect::DialectKind;
use tracing::debug;

#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
}

impl MySqlAdapter {
    /// Builds the pool and checks out one connection, so a bad URL or an
    /// unreachable server fails here rather than on first use.
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url).map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let pool = Pool::new(opts);
        let conn = pool.get_conn().await?;
        drop(conn);
        Ok(MySqlAdapter { pool })
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get_conn().await?;
        conn.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MySqlAdapter {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<SourceRow>, DbError> {
        let mut conn = self.pool.get_conn().await?;
        let bindings = MySqlParamStore::from_values(params);
        let rows: Vec<Row> = conn.exec(sql, bindings.params()).await?;
        debug!(rows = rows.len(), "Fetched rows from MySQL");
        rows.iter()
            .map(|row| DbRow::MySqlRow(row).to_source_row())
            .collect()
    }
}

#[async_trait]
impl TargetStore for MySqlAdapter {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn TargetTransaction + 'a>, DbError> {
        let tx = self.pool.start_transaction(TxOpts::default()).await?;
        Ok(Box::new(MySqlTransaction { tx }))
    }
}

/// Owns a pooled connection for the life of the transaction. mysql_async
/// rolls back on drop if neither commit nor rollback was called.
pub struct MySqlTransaction {
    tx: mysql_async::Transaction<'static>,
}

#[async_trait]
impl TargetTransaction for MySqlTransaction {
    async fn exists(&mut self, sql: &str, params: &[Value]) -> Result<bool, DbError> {
        let bindings = MySqlParamStore::from_values(params);
        let row: Option<Row> = self.tx.exec_first(sql, bindings.params()).await?;
        Ok(row.is_some())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let bindings = MySqlParamStore::from_values(params);
        self.tx.exec_drop(sql, bindings.params()).await?;
        Ok(self.tx.affected_rows())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
