use crate::sql::base::error::{ConnectorError, DbError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection URL names a database this crate cannot talk to.
    #[error("Unsupported database scheme: {0}")]
    UnsupportedScheme(String),

    /// Failed to initialize a data connector/adapter.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Database-related error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
