use engine_config::error::SettingsError;
use engine_core::error::ReportingError;
use thiserror::Error;

/// Errors surfaced to whoever submits a run. Once a run is dispatched its
/// outcome travels through the completion report instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The run could not be registered with the manager, so it has no
    /// execution id and is not dispatched.
    #[error("Failed to register execution: {0}")]
    StartReport(#[source] ReportingError),

    /// The progress reporter for the run could not be built.
    #[error("Reporter error: {0}")]
    Reporter(#[from] ReportingError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The task driving a run was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
