//! Process entry point: parses CLI arguments, boots the wired application
//! context, and serves HTTP until a shutdown signal arrives.

use std::path::PathBuf;

use clap::Parser;
use ruleguard::infrastructure::logging::{self, LogFormat};
use ruleguard::server::{router, AppState};

/// ruleguard - a rule lifecycle coordinator for distributed-tracing spans.
#[derive(Debug, Parser)]
#[command(name = "ruleguard", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Missing files are ignored;
    /// built-in defaults and environment variables still apply.
    #[arg(long, env = "RULEGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as newline-delimited JSON instead of human-readable text.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.json_logs { LogFormat::Json } else { LogFormat::Text });

    let (config, context) = ruleguard::bootstrap(cli.config).await?;
    tracing::info!(bind_address = %config.bind_address, "starting ruleguard");

    let state = AppState::new(std::sync::Arc::clone(&context));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.trace_buffer.stop().await;
    tracing::info!("ruleguard shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
