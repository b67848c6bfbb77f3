use thiserror::Error;

/// Errors raised while loading runtime settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A variable needed for this operation is not set.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// The env file could not be read or is malformed.
    #[error("Env file error: {0}")]
    EnvFile(String),
}
