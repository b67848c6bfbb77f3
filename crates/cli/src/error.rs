use connectors::{error::AdapterError, sql::base::error::DbError};
use engine_config::error::SettingsError;
use engine_runtime::error::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the request file: {0}")]
    RequestRead(#[from] std::io::Error),

    #[error("Failed to parse the request file as JSON: {0}")]
    RequestParse(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to dispatch the run: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Connection failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}
