//! Layered configuration: built-in defaults, overridden by an optional TOML
//! file, overridden by `RULEGUARD_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use ruleguard_domain::constants::{DEFAULT_VIOLATION_QUERY_LIMIT, MAX_SPANS_PER_BATCH, TRACE_IDLE_WINDOW};
use ruleguard_domain::error::{Error, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the SQLite rule store database file.
    pub store_path: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Duration of trace inactivity after which a trace is flushed, in
    /// milliseconds.
    pub trace_idle_window_millis: u64,
    /// Maximum number of spans accepted in a single ingest batch.
    pub max_spans_per_batch: usize,
    /// Default page size applied to violation queries when the caller
    /// passes zero.
    pub default_violation_query_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("ruleguard.sqlite"),
            bind_address: "127.0.0.1:8080".to_owned(),
            trace_idle_window_millis: u64::try_from(TRACE_IDLE_WINDOW.as_millis()).unwrap_or(3_000),
            max_spans_per_batch: MAX_SPANS_PER_BATCH,
            default_violation_query_limit: DEFAULT_VIOLATION_QUERY_LIMIT,
        }
    }
}

impl AppConfig {
    /// Load configuration from built-in defaults, merged with an optional
    /// TOML file at `config_path` (if it exists), merged with
    /// `RULEGUARD_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the merged configuration fails to
    /// deserialize (e.g. a malformed TOML file or an env var with the wrong
    /// type).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_path
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("RULEGUARD_"));

        figment
            .extract()
            .map_err(|err| Error::config(format!("failed to load configuration: {err}")))
    }

    /// `trace_idle_window_millis` as a [`std::time::Duration`].
    #[must_use]
    pub fn trace_idle_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.trace_idle_window_millis)
    }
}
