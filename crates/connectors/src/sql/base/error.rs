use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// A fetched column has a type the row decoder does not understand.
    #[error("Unsupported type '{type_name}' for column '{column}'")]
    UnsupportedColumnType { column: String, type_name: String },

    /// A value could not be decoded from its wire representation.
    #[error("Decode error for column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// A value cannot be bound to the target's parameter without losing data.
    #[error("Cannot bind value '{value}': {reason}")]
    UnsupportedValue { value: String, reason: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("PostgreSQL connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),
}
