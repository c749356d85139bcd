//! Shared application state handed to every handler.

use std::sync::Arc;

use ruleguard_infrastructure::AppContext;

/// Cloneable handle to the wired application context. Cloning only bumps
/// the inner `Arc`'s reference count.
#[derive(Clone)]
pub struct AppState {
    /// The fully-wired adapters and use cases.
    pub context: Arc<AppContext>,
}

impl AppState {
    /// Wrap a context for use as axum router state.
    #[must_use]
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}
