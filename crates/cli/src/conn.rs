use crate::error::CliError;
use connectors::adapter::{Adapter, redact};
use tracing::{error, info};

/// Connects to `url` and runs `SELECT 1`.
pub async fn ping(url: &str) -> Result<(), CliError> {
    let target = redact(url);
    info!(url = %target, "Pinging database");

    let adapter = Adapter::connect(url).await.inspect_err(|e| {
        error!(url = %target, error = %e, "Connection failed");
    })?;
    adapter.ping().await.inspect_err(|e| {
        error!(url = %target, error = %e, "Ping query failed");
    })?;

    info!(url = %target, kind = %adapter.kind(), "Ping succeeded");
    Ok(())
}
