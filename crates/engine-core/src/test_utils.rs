use crate::{error::ReportingError, progress::ProgressReporter};
use async_trait::async_trait;
use model::events::{CompletionEvent, ProgressEvent, StartEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Recorded {
    starts: Vec<StartEvent>,
    progress: Vec<ProgressEvent>,
    completions: Vec<CompletionEvent>,
}

/// Keeps every event it receives. `report_start` hands out ids from
/// `next_exec_id` upwards, or fails when built with [`RecordingReporter::failing_start`].
#[derive(Debug, Clone)]
pub struct RecordingReporter {
    recorded: Arc<Mutex<Recorded>>,
    next_exec_id: Arc<Mutex<Option<i64>>>,
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(exec_id: i64) -> Self {
        Self {
            recorded: Arc::default(),
            next_exec_id: Arc::new(Mutex::new(Some(exec_id))),
        }
    }

    pub fn failing_start() -> Self {
        Self {
            recorded: Arc::default(),
            next_exec_id: Arc::new(Mutex::new(None)),
        }
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn starts(&self) -> Vec<StartEvent> {
        self.recorded().starts.clone()
    }

    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.recorded().progress.clone()
    }

    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.recorded().completions.clone()
    }

    /// Percent values of every positioned progress event, in order.
    pub fn percents(&self) -> Vec<u8> {
        self.recorded()
            .progress
            .iter()
            .filter_map(|e| e.percent)
            .collect()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn report_start(&self, event: StartEvent) -> Result<i64, ReportingError> {
        self.recorded().starts.push(event);
        let mut next = self
            .next_exec_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match next.as_mut() {
            Some(id) => {
                let assigned = *id;
                *id += 1;
                Ok(assigned)
            }
            None => Err(ReportingError::Transport("manager unreachable".into())),
        }
    }

    async fn report_progress(&self, event: ProgressEvent) {
        self.recorded().progress.push(event);
    }

    async fn report_complete(&self, event: CompletionEvent) {
        self.recorded().completions.push(event);
    }
}
