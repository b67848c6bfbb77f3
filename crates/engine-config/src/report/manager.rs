//! HTTP client for the external manager that tracks executions.

use crate::settings::Settings;
use async_trait::async_trait;
use engine_core::{error::ReportingError, progress::ProgressReporter};
use model::events::{CompletionEvent, LogLevel, ProgressEvent, StartEvent};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const START_PATH: &str = "execution/start";
const PROGRESS_PATH: &str = "progress";
const COMPLETE_PATH: &str = "execution/complete";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest<'a> {
    module_id: &'a str,
    exec_type: &'a str,
    exec_user: Option<&'a str>,
    module_version: &'a str,
    host_info: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRequest<'a> {
    exec_id: i64,
    module_id: &'a str,
    current_step: &'a str,
    progress_percent: Option<u8>,
    processed_count: Option<u64>,
    total_count: Option<u64>,
    message: &'a str,
    log_level: LogLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest<'a> {
    exec_id: i64,
    module_id: &'a str,
    success: bool,
    processed_count: u64,
    error_count: u64,
    result_message: &'a str,
    error_message: Option<&'a str>,
    execution_time_ms: u64,
}

/// Envelope every manager endpoint answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone)]
pub struct ManagerClient {
    http: reqwest::Client,
    base_url: String,
    module_id: String,
    module_version: String,
}

impl ManagerClient {
    pub fn new(
        base_url: &str,
        module_id: impl Into<String>,
        module_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReportingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportingError::Transport(e.to_string()))?;
        Ok(ManagerClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            module_id: module_id.into(),
            module_version: module_version.into(),
        })
    }

    pub fn from_settings(settings: &Settings, base_url: &str) -> Result<Self, ReportingError> {
        Self::new(
            base_url,
            settings.module_id.clone(),
            settings.module_version.clone(),
            settings.report_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Posts `body` and checks the status. The response body is left to
    /// the caller; progress and completion ignore it.
    async fn post<B>(&self, path: &str, body: &B) -> Result<reqwest::Response, ReportingError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!(%url, "Posting to manager");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ReportingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportingError::Rejected(format!("HTTP {status}")));
        }
        Ok(response)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ReportingError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, body)
            .await?
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| ReportingError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ProgressReporter for ManagerClient {
    async fn report_start(&self, event: StartEvent) -> Result<i64, ReportingError> {
        let request = StartRequest {
            module_id: &event.module_id,
            exec_type: &event.exec_type,
            exec_user: event.exec_user.as_deref(),
            module_version: &self.module_version,
            host_info: host_info(),
        };

        let response = self
            .post_json::<_, i64>(START_PATH, &request)
            .await
            .inspect_err(|err| error!(%err, base_url = %self.base_url, "Start report failed"))?;

        match response.data {
            Some(exec_id) => {
                info!(exec_id, "Execution registered with manager");
                Ok(exec_id)
            }
            None => {
                error!(message = ?response.message, "Start report returned no execution id");
                Err(ReportingError::MissingExecId)
            }
        }
    }

    async fn report_progress(&self, event: ProgressEvent) {
        let request = ProgressRequest {
            exec_id: event.exec_id,
            module_id: &self.module_id,
            current_step: &event.step,
            progress_percent: event.percent,
            processed_count: event.processed_count,
            total_count: event.total_count,
            message: &event.message,
            log_level: event.level,
        };

        match self.post(PROGRESS_PATH, &request).await {
            Ok(_) => debug!(
                exec_id = event.exec_id,
                step = %event.step,
                percent = ?event.percent,
                "Progress reported"
            ),
            Err(err) => warn!(exec_id = event.exec_id, %err, "Progress report failed, continuing"),
        }
    }

    async fn report_complete(&self, event: CompletionEvent) {
        let request = CompleteRequest {
            exec_id: event.exec_id,
            module_id: &self.module_id,
            success: event.success,
            processed_count: event.processed_count,
            error_count: event.error_count,
            result_message: &event.result_message,
            error_message: event.error_message.as_deref(),
            execution_time_ms: event.elapsed_millis,
        };

        info!(
            exec_id = event.exec_id,
            success = event.success,
            processed = event.processed_count,
            errors = event.error_count,
            "Reporting completion"
        );
        if let Err(err) = self.post(COMPLETE_PATH, &request).await {
            error!(exec_id = event.exec_id, %err, "Completion report failed");
        }
    }
}

/// Host name of this machine, or `"Unknown"`.
fn host_info() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::{Value as JsonValue, json};
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    type Captured = Arc<Mutex<Vec<(String, JsonValue)>>>;

    async fn serve(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();

        let record = move |path: &'static str| {
            move |State(captured): State<Captured>, Json(body): Json<JsonValue>| async move {
                captured.lock().unwrap().push((path.to_string(), body));
                (
                    status,
                    Json(json!({"success": true, "message": "ok", "data": 42})),
                )
            }
        };

        let app = Router::new()
            .route("/api/execution/start", post(record("start")))
            .route("/api/progress", post(record("progress")))
            .route("/api/execution/complete", post(record("complete")))
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/api/"), captured)
    }

    fn client(base: &str) -> ManagerClient {
        ManagerClient::new(base, "tablesync", "1.2.3", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn start_returns_the_assigned_exec_id() {
        let (base, captured) = serve(StatusCode::OK).await;
        let exec_id = client(&base)
            .report_start(StartEvent {
                module_id: "tablesync".into(),
                exec_type: "AUTO".into(),
                exec_user: None,
            })
            .await
            .unwrap();

        assert_eq!(exec_id, 42);
        let captured = captured.lock().unwrap();
        let (path, body) = &captured[0];
        assert_eq!(path, "start");
        assert_eq!(body["execType"], "AUTO");
        assert_eq!(body["moduleVersion"], "1.2.3");
        assert!(body["execUser"].is_null());
        assert!(body["hostInfo"].is_string());
    }

    #[tokio::test]
    async fn progress_and_completion_use_camel_case_bodies() {
        let (base, captured) = serve(StatusCode::OK).await;
        let client = client(&base);

        client
            .report_progress(ProgressEvent {
                exec_id: 7,
                step: "sync source_data".into(),
                percent: Some(42),
                processed_count: Some(100),
                total_count: Some(250),
                message: "batch committed".into(),
                level: LogLevel::Info,
            })
            .await;
        client
            .report_complete(CompletionEvent {
                exec_id: 7,
                success: true,
                processed_count: 250,
                error_count: 0,
                result_message: "done".into(),
                error_message: None,
                elapsed_millis: 1500,
            })
            .await;

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        let progress = &captured[0].1;
        assert_eq!(progress["execId"], 7);
        assert_eq!(progress["moduleId"], "tablesync");
        assert_eq!(progress["currentStep"], "sync source_data");
        assert_eq!(progress["progressPercent"], 42);
        assert_eq!(progress["logLevel"], "INFO");
        let complete = &captured[1].1;
        assert_eq!(complete["executionTimeMs"], 1500);
        assert_eq!(complete["processedCount"], 250);
    }

    #[tokio::test]
    async fn rejected_start_is_an_error() {
        let (base, _) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;
        let err = client(&base)
            .report_start(StartEvent {
                module_id: "tablesync".into(),
                exec_type: "AUTO".into(),
                exec_user: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReportingError::Rejected(_)));
    }

    #[traced_test]
    #[tokio::test]
    async fn unreachable_manager_is_swallowed_for_progress() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = client("http://127.0.0.1:9");
        client
            .report_progress(ProgressEvent {
                exec_id: 1,
                step: "start".into(),
                percent: Some(0),
                processed_count: None,
                total_count: None,
                message: "starting".into(),
                level: LogLevel::Info,
            })
            .await;
        assert!(logs_contain("Progress report failed"));
    }
}
