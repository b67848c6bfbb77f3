use crate::sql::{
    base::{
        error::{ConnectorError, DbError},
        row::DbRow,
        store::{SourceStore, TargetStore, TargetTransaction},
    },
    postgres::{params::PgParamStore, utils::connect_client},
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::SourceRow};
use planner::query::dialect::DialectKind;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_postgres::{Client, Statement};
use tracing::{debug, warn};

/// A client plus the statements prepared on it. Prepared statements are
/// bound to the connection that created them, so the two travel together.
pub struct PgSession {
    client: Client,
    statements: HashMap<String, Statement>,
}

impl PgSession {
    async fn prepare(&mut self, sql: &str) -> Result<Statement, DbError> {
        if let Some(stmt) = self.statements.get(sql) {
            return Ok(stmt.clone());
        }
        let stmt = self.client.prepare(sql).await?;
        self.statements.insert(sql.to_string(), stmt.clone());
        Ok(stmt)
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<tokio_postgres::Row>, DbError> {
        let stmt = self.prepare(sql).await?;
        let bindings = PgParamStore::for_types(params, stmt.params())?;
        Ok(self.client.query(&stmt, &bindings.as_refs()).await?)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let stmt = self.prepare(sql).await?;
        let bindings = PgParamStore::for_types(params, stmt.params())?;
        Ok(self.client.execute(&stmt, &bindings.as_refs()).await?)
    }
}

#[derive(Clone)]
pub struct PgAdapter {
    session: Arc<Mutex<PgSession>>,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgAdapter {
            session: Arc::new(Mutex::new(PgSession {
                client,
                statements: HashMap::new(),
            })),
        })
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        let session = self.session.lock().await;
        session.client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

#[async_trait]
impl SourceStore for PgAdapter {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<SourceRow>, DbError> {
        let mut session = self.session.lock().await;
        let rows = session.query(sql, params).await?;
        debug!(rows = rows.len(), "Fetched rows from Postgres");
        rows.iter()
            .map(|row| DbRow::PostgresRow(row).to_source_row())
            .collect()
    }
}

#[async_trait]
impl TargetStore for PgAdapter {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn TargetTransaction + 'a>, DbError> {
        let session = self.session.clone().lock_owned().await;
        session.client.batch_execute("BEGIN").await?;
        Ok(Box::new(PgTransaction {
            session: Some(session),
        }))
    }
}

/// Holds the session exclusively from `BEGIN` until `COMMIT`/`ROLLBACK`,
/// so no other statement can interleave with the open transaction.
pub struct PgTransaction {
    session: Option<OwnedMutexGuard<PgSession>>,
}

impl PgTransaction {
    fn session(&mut self) -> Result<&mut PgSession, DbError> {
        self.session
            .as_deref_mut()
            .ok_or_else(|| DbError::Unknown("transaction already finished".to_string()))
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> Result<(), DbError> {
        match self.session.take() {
            Some(session) => {
                session.client.batch_execute(statement).await?;
                Ok(())
            }
            None => Err(DbError::Unknown("transaction already finished".to_string())),
        }
    }
}

#[async_trait]
impl TargetTransaction for PgTransaction {
    async fn exists(&mut self, sql: &str, params: &[Value]) -> Result<bool, DbError> {
        let rows = self.session()?.query(sql, params).await?;
        Ok(!rows.is_empty())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        self.session()?.execute(sql, params).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("Postgres transaction dropped while open, rolling back");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(err) = session.client.batch_execute("ROLLBACK").await {
                        warn!(%err, "Rollback of abandoned transaction failed");
                    }
                });
            }
        }
    }
}
