use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agstream_contract::Pacing;
use agstream_server::config::Config;
use agstream_server::http;
use agstream_server::service::AppState;

#[derive(Debug, Parser)]
#[command(name = "agstream-server")]
struct Args {
    #[arg(long, env = "AGSTREAM_HTTP_ADDR", default_value = "127.0.0.1:8124")]
    http_addr: String,

    /// JSON file listing agents; the built-in demo agents are used when absent.
    #[arg(long, env = "AGSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Abort runs that take longer than this many milliseconds.
    #[arg(long, env = "AGSTREAM_RUN_TIMEOUT_MS")]
    run_timeout_ms: Option<u64>,

    /// Delay before each chunk for every agent, overriding per-agent values.
    /// Zero disables pacing.
    #[arg(long, env = "AGSTREAM_CHUNK_DELAY_MS")]
    chunk_delay_ms: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "AGSTREAM_LOG_JSON")]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.with_target(true).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_json);

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = %e, "invalid configuration");
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };
    let agent_ids: Vec<String> = config.agents.iter().map(|a| a.id.clone()).collect();

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build tool registry");
            return ExitCode::from(2);
        }
    };
    let shutdown = CancellationToken::new();
    let state = state
        .with_run_timeout(args.run_timeout_ms.map(Duration::from_millis))
        .with_pacing_override(args.chunk_delay_ms.map(Pacing::from_millis))
        .with_shutdown(shutdown.clone());
    let app = http::router(state);

    let listener = match tokio::net::TcpListener::bind(&args.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %args.http_addr, error = %e, "failed to bind http listener");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %args.http_addr, agents = ?agent_ids, "agstream server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            shutdown.cancel();
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "http server crashed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
