use crate::{
    error::AdapterError,
    sql::{
        base::{
            error::DbError,
            store::{SourceStore, TargetStore},
        },
        mysql::adapter::MySqlAdapter,
        postgres::adapter::PgAdapter,
    },
};
use async_trait::async_trait;
use planner::query::dialect::DialectKind;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlAdapter),
    Postgres(PgAdapter),
}

impl Adapter {
    /// Picks the driver from the URL scheme (`postgres://`, `postgresql://`,
    /// `mysql://` or `mariadb://`).
    pub fn kind_for_url(url: &str) -> Result<DialectKind, AdapterError> {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| AdapterError::UnsupportedScheme(redact(url)))?;
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            other => Err(AdapterError::UnsupportedScheme(other.to_string())),
        }
    }

    pub async fn connect(url: &str) -> Result<Self, AdapterError> {
        let adapter = match Self::kind_for_url(url)? {
            DialectKind::Postgres => Adapter::Postgres(PgAdapter::connect(url).await?),
            DialectKind::MySql => Adapter::MySql(MySqlAdapter::connect(url).await?),
        };
        info!(url = %redact(url), kind = %adapter.kind(), "Connected");
        Ok(adapter)
    }

    pub fn kind(&self) -> DialectKind {
        match self {
            Adapter::MySql(_) => DialectKind::MySql,
            Adapter::Postgres(_) => DialectKind::Postgres,
        }
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        match self {
            Adapter::MySql(adapter) => adapter.ping().await,
            Adapter::Postgres(adapter) => adapter.ping().await,
        }
    }

    pub fn into_source(self) -> Arc<dyn SourceStore> {
        match self {
            Adapter::MySql(adapter) => Arc::new(adapter),
            Adapter::Postgres(adapter) => Arc::new(adapter),
        }
    }

    pub fn into_target(self) -> Arc<dyn TargetStore> {
        match self {
            Adapter::MySql(adapter) => Arc::new(adapter),
            Adapter::Postgres(adapter) => Arc::new(adapter),
        }
    }
}

/// Opens the source and target stores for one run. Each call yields fresh
/// connections; runs never share them.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open_source(&self) -> Result<Arc<dyn SourceStore>, AdapterError>;
    async fn open_target(&self) -> Result<Arc<dyn TargetStore>, AdapterError>;
}

#[derive(Debug, Clone)]
pub struct UrlConnector {
    source_url: String,
    target_url: String,
}

impl UrlConnector {
    pub fn new(source_url: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            target_url: target_url.into(),
        }
    }
}

#[async_trait]
impl StoreConnector for UrlConnector {
    async fn open_source(&self) -> Result<Arc<dyn SourceStore>, AdapterError> {
        Ok(Adapter::connect(&self.source_url).await?.into_source())
    }

    async fn open_target(&self) -> Result<Arc<dyn TargetStore>, AdapterError> {
        Ok(Adapter::connect(&self.target_url).await?.into_target())
    }
}

/// Strips credentials from a connection URL for logging.
pub fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, _)), Some(at)) => format!("{scheme}://***{}", &url[at..]),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_selects_driver() {
        assert_eq!(
            Adapter::kind_for_url("postgresql://u:p@localhost/db").unwrap(),
            DialectKind::Postgres
        );
        assert_eq!(
            Adapter::kind_for_url("MYSQL://root@localhost:3306/db").unwrap(),
            DialectKind::MySql
        );
        assert!(matches!(
            Adapter::kind_for_url("sqlite://file.db"),
            Err(AdapterError::UnsupportedScheme(s)) if s == "sqlite"
        ));
        assert!(Adapter::kind_for_url("localhost:5432").is_err());
    }

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact("postgres://user:secret@db:5432/app"),
            "postgres://***@db:5432/app"
        );
        assert_eq!(redact("mysql://db/app"), "mysql://db/app");
    }
}
