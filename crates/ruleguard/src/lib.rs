//! ruleguard: a rule lifecycle coordinator that evaluates declarative rules
//! against distributed-tracing span data and records violations.
//!
//! This crate re-exports the layers the binary wires together; the binary
//! itself (`src/main.rs`) only parses CLI arguments and drives startup and
//! shutdown.

pub use ruleguard_application as application;
pub use ruleguard_domain as domain;
pub use ruleguard_infrastructure as infrastructure;
pub use ruleguard_providers as providers;
pub use ruleguard_server as server;

use std::path::PathBuf;
use std::sync::Arc;

use ruleguard_domain::error::Result;
use ruleguard_domain::ports::RuleEngine;
use ruleguard_infrastructure::{AppConfig, AppContext};
use ruleguard_providers::EvalexprRuleEngine;

/// Build the application context from a config file path (if any), using
/// the `evalexpr`-backed rule engine.
///
/// # Errors
///
/// Returns the infrastructure layer's error if configuration loading or
/// store initialization fails.
pub async fn bootstrap(config_path: Option<PathBuf>) -> Result<(AppConfig, Arc<AppContext>)> {
    let config = AppConfig::load(config_path.as_deref())?;
    let engine: Arc<dyn RuleEngine> = Arc::new(EvalexprRuleEngine::new());
    let context = Arc::new(AppContext::bootstrap(&config, engine).await?);
    Ok((config, context))
}
