use crate::{error::CliError, shutdown::ExitCode};
use clap::Parser;
use commands::Commands;
use engine_config::settings::Settings;
use engine_runtime::execution::dispatcher::RunDispatcher;
use model::execution::request::RunRequest;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "tablesync", version, about = "Configuration-driven table synchronizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match execute(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "Command failed");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Run { request, env_file } => {
            let settings = match env_file {
                Some(path) => Settings::from_env_file(path)?,
                None => Settings::from_env()?,
            };
            let request = load_request(&request).await?;
            run(settings, request).await
        }
        Commands::Validate {
            request,
            source_dialect,
            target_dialect,
        } => {
            let request = load_request(&request).await?;
            let config = request.mapping_config.unwrap_or_default();
            if let Err(err) = config.validate() {
                error!(%err, "Mapping config is invalid");
                return Ok(ExitCode::GeneralError);
            }
            let previews =
                output::preview(&config, source_dialect.into(), target_dialect.into());
            output::print_json(&previews)?;

            let invalid = previews.iter().filter(|p| p.error.is_some()).count();
            if invalid > 0 {
                warn!(invalid, "Some table mappings would fail");
            }
            Ok(ExitCode::Success)
        }
        Commands::TestConn { url } => {
            conn::ping(&url).await?;
            Ok(ExitCode::Success)
        }
    }
}

async fn run(settings: Settings, request: RunRequest) -> Result<ExitCode, CliError> {
    info!(?settings, "Loaded settings");
    let dispatcher = RunDispatcher::from_settings(settings)?;
    let handle = dispatcher.dispatch(request).await?;
    let exec_id = handle.exec_id;

    tokio::select! {
        result = handle.wait() => {
            let result = result?;
            output::print_json(&result)?;
            Ok(if result.success { ExitCode::Success } else { ExitCode::RunFailed })
        }
        _ = shutdown::signal_received() => {
            warn!(exec_id, "Interrupted; the run ends without a completion report");
            Ok(ExitCode::ShutdownRequested)
        }
    }
}

async fn load_request(path: &str) -> Result<RunRequest, CliError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}
