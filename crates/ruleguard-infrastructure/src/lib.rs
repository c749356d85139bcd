//! Infrastructure layer for ruleguard.
//!
//! Concrete adapters for the domain's port traits: a SQLite-backed rule
//! store, an in-memory trace buffer with a background flush scheduler, an
//! in-memory violation store, layered configuration, logging
//! initialization, and the dependency-injection wiring that assembles them.

pub mod buffer;
pub mod config;
pub mod di;
pub mod logging;
pub mod storage;

pub use buffer::InMemoryTraceBuffer;
pub use config::AppConfig;
pub use di::AppContext;
pub use storage::{InMemoryViolationStore, SqliteRuleStore};
