use std::process::ExitCode;

use pr_reviewer_lib::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load_with_dotenv() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pr-reviewer: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.log.filter) {
        eprintln!("pr-reviewer: {e}");
        return ExitCode::FAILURE;
    }

    match pr_reviewer_lib::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[server] {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured filter.
/// `log` records are forwarded through the tracing-log bridge.
fn init_tracing(default_filter: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))
}
