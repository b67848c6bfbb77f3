//! Accepts run requests and executes them on a bounded pool of workers.

use crate::{
    error::RuntimeError,
    execution::{
        orchestrator::SyncOrchestrator,
        reporter::{ManagerReporters, ReporterFactory},
    },
};
use connectors::adapter::{StoreConnector, UrlConnector};
use engine_config::settings::Settings;
use model::{
    events::StartEvent,
    execution::{request::RunRequest, result::RunResult},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{error, info, warn};

/// Execution type sent when the dispatcher registers a run itself.
pub const AUTO_EXEC_TYPE: &str = "AUTO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStatus {
    pub active: usize,
    pub queued: usize,
    pub capacity: usize,
}

/// A dispatched run.
#[derive(Debug)]
pub struct RunHandle {
    pub exec_id: i64,
    handle: JoinHandle<RunResult>,
}

impl RunHandle {
    /// Waits for the run to finish.
    pub async fn wait(self) -> Result<RunResult, RuntimeError> {
        Ok(self.handle.await?)
    }
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    queued: AtomicUsize,
}

pub struct RunDispatcher {
    settings: Arc<Settings>,
    connector: Arc<dyn StoreConnector>,
    reporters: Arc<dyn ReporterFactory>,
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl RunDispatcher {
    pub fn new(
        settings: Arc<Settings>,
        connector: Arc<dyn StoreConnector>,
        reporters: Arc<dyn ReporterFactory>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_runs.max(1)));
        Self {
            settings,
            connector,
            reporters,
            permits,
            counters: Arc::default(),
        }
    }

    /// Connects to the configured database URLs and reports to the manager.
    pub fn from_settings(settings: Settings) -> Result<Self, RuntimeError> {
        let connector = UrlConnector::new(settings.source_url()?, settings.target_url()?);
        let settings = Arc::new(settings);
        let reporters = ManagerReporters::new(settings.clone());
        Ok(Self::new(settings, Arc::new(connector), Arc::new(reporters)))
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            active: self.counters.active.load(Ordering::SeqCst),
            queued: self.counters.queued.load(Ordering::SeqCst),
            capacity: self.settings.max_concurrent_runs.max(1),
        }
    }

    /// Registers the run when it carries no execution id, then queues it.
    ///
    /// Errors are returned only while the request is being accepted. Once a
    /// handle is returned the run's outcome travels through its completion
    /// report and the handle's [`RunResult`].
    pub async fn dispatch(&self, request: RunRequest) -> Result<RunHandle, RuntimeError> {
        let reporter = self.reporters.reporter_for(request.callback_url())?;

        let exec_id = match request.exec_id {
            Some(exec_id) => exec_id,
            None => {
                let module_id = request
                    .module_id
                    .clone()
                    .unwrap_or_else(|| self.settings.module_id.clone());
                reporter
                    .report_start(StartEvent {
                        module_id,
                        exec_type: AUTO_EXEC_TYPE.to_string(),
                        exec_user: None,
                    })
                    .await
                    .map_err(|err| {
                        error!(%err, "Run rejected, no execution id");
                        RuntimeError::StartReport(err)
                    })?
            }
        };

        let config = request.mapping_config.unwrap_or_else(|| {
            warn!(exec_id, "Run request carries no mapping config");
            Default::default()
        });
        let orchestrator = SyncOrchestrator::new(self.connector.clone(), reporter)
            .with_batch_size(self.settings.batch_size)
            .with_strategy(self.settings.upsert_strategy);

        let permits = self.permits.clone();
        let counters = self.counters.clone();
        counters.queued.fetch_add(1, Ordering::SeqCst);
        info!(exec_id, "Run queued");

        let handle = tokio::spawn(async move {
            // Never closed.
            let _permit = permits.acquire_owned().await.ok();
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            counters.active.fetch_add(1, Ordering::SeqCst);

            let result = orchestrator.execute_sync(exec_id, &config).await;

            counters.active.fetch_sub(1, Ordering::SeqCst);
            result
        });

        Ok(RunHandle { exec_id, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::reporter::SharedReporter;
    use connectors::test_utils::memory::{MemoryConnector, MemoryStore};
    use engine_core::test_utils::RecordingReporter;
    use model::{
        core::value::Value,
        mapping::config::{MappingConfig, TableMapping},
        records::row::SourceRow,
    };
    use tracing_test::traced_test;

    fn dispatcher(reporter: &RecordingReporter, connector: MemoryConnector) -> RunDispatcher {
        RunDispatcher::new(
            Arc::new(Settings::default()),
            Arc::new(connector),
            Arc::new(SharedReporter(Arc::new(reporter.clone()))),
        )
    }

    fn stores() -> MemoryConnector {
        let rows = (1..=3)
            .map(|id| SourceRow::from_pairs([("id", Value::Int(id))]))
            .collect();
        MemoryConnector::new(
            MemoryStore::default().with_table("src", rows),
            MemoryStore::default().with_table("dst", vec![]),
        )
    }

    fn request() -> RunRequest {
        RunRequest::new(MappingConfig::new(
            vec![TableMapping::new("src", "dst", "id", "id")],
            None,
        ))
    }

    #[tokio::test]
    async fn registers_runs_without_an_exec_id() {
        let reporter = RecordingReporter::starting_at(40);
        let handle = dispatcher(&reporter, stores())
            .dispatch(request())
            .await
            .unwrap();

        assert_eq!(handle.exec_id, 40);
        let result = handle.wait().await.unwrap();
        assert!(result.success);
        assert_eq!(result.processed_count, 3);

        let starts = reporter.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].exec_type, "AUTO");
        assert_eq!(starts[0].module_id, "tablesync");
        assert_eq!(reporter.completions()[0].exec_id, 40);
    }

    #[tokio::test]
    async fn supplied_exec_id_skips_registration() {
        let reporter = RecordingReporter::new();
        let handle = dispatcher(&reporter, stores())
            .dispatch(request().with_exec_id(99))
            .await
            .unwrap();

        assert_eq!(handle.exec_id, 99);
        handle.wait().await.unwrap();
        assert!(reporter.starts().is_empty());
        assert!(reporter.progress().iter().all(|e| e.exec_id == 99));
    }

    #[traced_test]
    #[tokio::test]
    async fn failed_registration_rejects_the_request() {
        let reporter = RecordingReporter::failing_start();
        let err = dispatcher(&reporter, stores())
            .dispatch(request())
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::StartReport(_)));
        assert!(reporter.completions().is_empty());
        assert!(logs_contain("Run rejected"));
    }

    #[tokio::test]
    async fn request_without_mappings_fails_validation() {
        let reporter = RecordingReporter::new();
        let result = dispatcher(&reporter, stores())
            .dispatch(RunRequest::default().with_exec_id(5))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(reporter.completions().len(), 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn null_table_mappings_complete_as_a_failed_run() {
        let request: RunRequest = serde_json::from_str(
            r#"{"execId": 8, "mappingConfig": {"tableMappings": null}}"#,
        )
        .unwrap();
        let reporter = RecordingReporter::new();
        let result = dispatcher(&reporter, stores())
            .dispatch(request)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Configuration error: no table mappings")
        );
        let completions = reporter.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].exec_id, 8);
    }

    #[tokio::test]
    async fn runs_beyond_capacity_queue_and_all_finish() {
        let reporter = RecordingReporter::new();
        let settings = Settings {
            max_concurrent_runs: 1,
            ..Settings::default()
        };
        let dispatcher = RunDispatcher::new(
            Arc::new(settings),
            Arc::new(stores()),
            Arc::new(SharedReporter(Arc::new(reporter.clone()))),
        );
        assert_eq!(dispatcher.status().capacity, 1);

        let mut handles = Vec::new();
        for exec_id in 1..=3 {
            handles.push(
                dispatcher
                    .dispatch(request().with_exec_id(exec_id))
                    .await
                    .unwrap(),
            );
        }
        for handle in handles {
            assert!(handle.wait().await.unwrap().success);
        }

        assert_eq!(reporter.completions().len(), 3);
        let status = dispatcher.status();
        assert_eq!((status.active, status.queued), (0, 0));
    }
}
