//! promsieve proxy
//!
//! Sits between a scraper and a metrics exporter: fetches the exporter on
//! every scrape, drops/keeps/thins series per the configured label filters,
//! and serves the result.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use promsieve_proxy::{app_state, config, server};

#[derive(Debug, Parser)]
#[command(name = "promsieve-proxy", version, about = "Label-filtering metrics proxy")]
struct Args {
    /// Path to the YAML config.
    #[arg(long, env = "PROMSIEVE_CONFIG", default_value = "promsieve.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let cfg = match config::load_from_file(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %args.config, error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let state = match app_state::AppState::new(&cfg) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(proxies = state.endpoints().len(), "promsieve-proxy starting");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match server::serve(state, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
