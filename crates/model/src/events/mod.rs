use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// A notification emitted by a run towards the manager.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted whenever a run moves forward or a table fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub exec_id: i64,
    pub step: String,
    /// Overall completion in `0..=100`; absent for events without a position.
    pub percent: Option<u8>,
    pub processed_count: Option<u64>,
    pub total_count: Option<u64>,
    pub message: String,
    pub level: LogLevel,
}

impl Event for ProgressEvent {
    fn event_type(&self) -> &'static str {
        "sync.progress"
    }
}

/// The terminal event of a run. Exactly one is emitted per dispatched run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub exec_id: i64,
    pub success: bool,
    pub processed_count: u64,
    pub error_count: u64,
    pub result_message: String,
    pub error_message: Option<String>,
    pub elapsed_millis: u64,
}

impl Event for CompletionEvent {
    fn event_type(&self) -> &'static str {
        "sync.completed"
    }
}

/// Registration of a run that arrived without an execution id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartEvent {
    pub module_id: String,
    pub exec_type: String,
    pub exec_user: Option<String>,
}

impl Event for StartEvent {
    fn event_type(&self) -> &'static str {
        "sync.started"
    }
}
