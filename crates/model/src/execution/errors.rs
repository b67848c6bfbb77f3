use thiserror::Error;

/// Problems with the mapping configuration itself, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no table mappings")]
    NoTableMappings,

    #[error("missing {side} primary key column for table '{table}'")]
    MissingPkColumn { side: &'static str, table: String },

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}
