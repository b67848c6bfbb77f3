//! The progress sink a run reports into, and the arithmetic that maps a
//! table's row counts onto the run's 0..=100 scale.

use crate::error::ReportingError;
use async_trait::async_trait;
use model::events::{CompletionEvent, LogLevel, ProgressEvent, StartEvent};

/// Percent reserved for startup, before the first table.
pub const START_PERCENT: u8 = 0;
/// First percent handed out to tables.
pub const TABLES_START: f64 = 10.0;
/// Share of the scale divided among tables.
pub const TABLES_WIDTH: f64 = 80.0;
pub const DONE_PERCENT: u8 = 100;

/// Best-effort notification sink.
///
/// Only `report_start` can fail visibly: a run without an execution id
/// cannot be reported at all. Progress and completion failures are the
/// implementor's to log and swallow.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report_start(&self, event: StartEvent) -> Result<i64, ReportingError>;

    async fn report_progress(&self, event: ProgressEvent);

    async fn report_complete(&self, event: CompletionEvent);
}

/// A table's slice of the overall progress scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f64,
    pub width: f64,
}

impl ProgressRange {
    /// Slice `index` of `count` equal slices over `10..90`.
    pub fn for_table(index: usize, count: usize) -> Self {
        let width = TABLES_WIDTH / count.max(1) as f64;
        ProgressRange {
            start: TABLES_START + index as f64 * width,
            width,
        }
    }

    pub fn start_percent(&self) -> u8 {
        clamp_percent(self.start)
    }

    /// `floor(start + width * processed / total)`, never past the slice end.
    pub fn percent_at(&self, processed: u64, total: u64) -> u8 {
        if total == 0 {
            return self.start_percent();
        }
        let fraction = (processed.min(total) as f64) / (total as f64);
        clamp_percent(self.start + self.width * fraction)
    }
}

/// Where one table's progress goes: the run's reporter, its execution id
/// and the table's slice of the scale.
#[derive(Clone, Copy)]
pub struct ProgressScope<'a> {
    pub reporter: &'a dyn ProgressReporter,
    pub exec_id: i64,
    pub range: ProgressRange,
}

impl<'a> ProgressScope<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, exec_id: i64, range: ProgressRange) -> Self {
        Self {
            reporter,
            exec_id,
            range,
        }
    }

    /// Reports `processed` of `total` rows done, positioned inside the range.
    pub async fn advance(&self, step: &str, processed: u64, total: u64, message: String) {
        self.reporter
            .report_progress(ProgressEvent {
                exec_id: self.exec_id,
                step: step.to_string(),
                percent: Some(self.range.percent_at(processed, total)),
                processed_count: Some(processed),
                total_count: Some(total),
                message,
                level: LogLevel::Info,
            })
            .await;
    }
}

fn clamp_percent(value: f64) -> u8 {
    value.floor().clamp(0.0, f64::from(DONE_PERCENT)) as u8
}
