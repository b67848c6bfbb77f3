use connectors::{error::AdapterError, sql::base::error::DbError};
use model::execution::errors::ConfigurationError;
use thiserror::Error;

/// A failure while synchronizing one table mapping. Siblings keep running.
#[derive(Debug, Error)]
#[error("sync of '{source_table}' -> '{target_table}' failed: {cause}")]
pub struct TableSyncError {
    pub source_table: String,
    pub target_table: String,
    #[source]
    pub cause: DbError,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    TableSync(#[from] TableSyncError),

    /// Opening the source or target store failed.
    #[error("Store error: {0}")]
    Store(#[from] AdapterError),
}

impl SyncError {
    /// Errors confined to a single table mapping.
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            SyncError::TableSync(_)
                | SyncError::Configuration(ConfigurationError::MissingPkColumn { .. })
        )
    }
}

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Request to manager failed: {0}")]
    Transport(String),

    #[error("Manager rejected the request: {0}")]
    Rejected(String),

    #[error("Manager response carried no execution id")]
    MissingExecId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_errors_to_tables() {
        let pk = SyncError::from(ConfigurationError::MissingPkColumn {
            side: "target",
            table: "t".into(),
        });
        assert!(pk.is_table_scoped());
        assert!(!SyncError::from(ConfigurationError::NoTableMappings).is_table_scoped());

        let table = SyncError::from(TableSyncError {
            source_table: "a".into(),
            target_table: "b".into(),
            cause: DbError::Unknown("boom".into()),
        });
        assert!(table.is_table_scoped());
        assert_eq!(table.to_string(), "sync of 'a' -> 'b' failed: Unknown error: boom");
    }
}
