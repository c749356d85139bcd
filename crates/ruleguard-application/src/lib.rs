//! Application layer for ruleguard.
//!
//! Orchestrates the domain ports: the rule administrator drives the
//! five-phase lifecycle protocols, the ingest coordinator validates and
//! routes incoming spans.

pub mod use_cases;

pub use use_cases::{IngestCoordinator, IngestSummary, RuleAdministrator};
