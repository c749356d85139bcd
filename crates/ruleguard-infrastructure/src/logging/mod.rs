//! Structured logging initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text, the default for interactive use.
    #[default]
    Text,
    /// Newline-delimited JSON, for ingestion by a log pipeline.
    Json,
}

/// Install the global `tracing` subscriber.
///
/// The filter is controlled by the `RUST_LOG` environment variable,
/// falling back to `info` when unset. Safe to call once at process start;
/// calling it twice panics (matches `tracing`'s own global-subscriber
/// contract).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer().boxed()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json().boxed()).init(),
    }
}
