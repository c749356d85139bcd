//! Server layer for ruleguard: thin `axum` HTTP transport adapters.
//!
//! No business logic lives here; every handler makes one direct call into
//! the application layer.

pub mod http;

pub use http::{router, AppState};
