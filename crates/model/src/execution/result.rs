use serde::{Deserialize, Serialize};

/// Outcome of a single table mapping within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOutcome {
    pub source_table: String,
    pub target_table: String,
    pub processed_count: u64,
    /// Set when the table failed; its rows are not counted as processed.
    pub error: Option<String>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate outcome of one run, mirrored by the final completion report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub exec_id: i64,
    pub success: bool,
    pub processed_count: u64,
    /// Number of table mappings that failed.
    pub error_count: u64,
    pub result_message: String,
    /// First top-level error, when one aborted the run.
    pub error_message: Option<String>,
    pub elapsed_millis: u64,
    pub tables: Vec<TableOutcome>,
}
