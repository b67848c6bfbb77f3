use crate::error::RuntimeError;
use engine_config::{report::ManagerClient, settings::Settings};
use engine_core::progress::ProgressReporter;
use std::sync::Arc;

/// Builds the progress reporter for one run. The callback URL is a per-run
/// value, so each run gets its own reporter.
pub trait ReporterFactory: Send + Sync {
    fn reporter_for(
        &self,
        callback_url: Option<&str>,
    ) -> Result<Arc<dyn ProgressReporter>, RuntimeError>;
}

/// Reports to the manager over HTTP, at the request's callback URL when it
/// carries one and at the configured one otherwise.
pub struct ManagerReporters {
    settings: Arc<Settings>,
}

impl ManagerReporters {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

impl ReporterFactory for ManagerReporters {
    fn reporter_for(
        &self,
        callback_url: Option<&str>,
    ) -> Result<Arc<dyn ProgressReporter>, RuntimeError> {
        let base_url = self.settings.callback_url_for(callback_url)?;
        let client = ManagerClient::from_settings(&self.settings, base_url)?;
        Ok(Arc::new(client))
    }
}

/// Hands the same reporter to every run, whatever its callback URL.
pub struct SharedReporter(pub Arc<dyn ProgressReporter>);

impl ReporterFactory for SharedReporter {
    fn reporter_for(&self, _: Option<&str>) -> Result<Arc<dyn ProgressReporter>, RuntimeError> {
        Ok(self.0.clone())
    }
}
