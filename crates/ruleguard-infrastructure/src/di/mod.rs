//! Dependency wiring: builds the concrete adapter graph from configuration.

use std::sync::{Arc, OnceLock};

use ruleguard_application::{IngestCoordinator, RuleAdministrator};
use ruleguard_domain::entities::TraceSlot;
use ruleguard_domain::error::Result;
use ruleguard_domain::fsm::{FsmRegistry, RuleEvent};
use ruleguard_domain::ports::{RuleEngine, RuleFilter, RuleStore, TraceBuffer, TraceSink, ViolationStore};

use crate::buffer::InMemoryTraceBuffer;
use crate::config::AppConfig;
use crate::storage::{InMemoryViolationStore, SqliteRuleStore};

/// The fully-wired set of adapters and use cases the server layer depends
/// on. Constructed once at process start.
pub struct AppContext {
    /// The rule administrator use case.
    pub administrator: Arc<RuleAdministrator>,
    /// The ingest coordinator use case.
    pub ingest: Arc<IngestCoordinator>,
    /// The trace buffer, kept so the binary can call `stop()` on shutdown.
    pub trace_buffer: Arc<dyn TraceBuffer>,
    /// The violation store, exposed for read endpoints.
    pub violations: Arc<dyn ViolationStore>,
    /// The rule engine, exposed for read endpoints.
    pub engine: Arc<dyn RuleEngine>,
}

impl AppContext {
    /// Build the context from `config`, opening the durable store at
    /// `config.store_path` and starting the trace buffer's background
    /// scheduler.
    ///
    /// The trace buffer and the ingest coordinator depend on each other
    /// (the buffer flushes into the coordinator, the coordinator feeds
    /// spans into the buffer), so the buffer is started against a
    /// [`ForwardingSink`] that is bound to the real coordinator once it
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the database cannot be opened.
    pub async fn bootstrap(config: &AppConfig, engine: Arc<dyn RuleEngine>) -> Result<Self> {
        let store: Arc<dyn RuleStore> = Arc::new(SqliteRuleStore::open(&config.store_path.to_string_lossy()).await?);
        let violations: Arc<dyn ViolationStore> = Arc::new(InMemoryViolationStore::new());
        let registry = Arc::new(FsmRegistry::new());

        reload_from_store(&store, &engine, &registry).await?;

        let administrator = Arc::new(RuleAdministrator::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&engine),
        ));

        let forwarding_sink = Arc::new(ForwardingSink::new());
        let trace_buffer: Arc<dyn TraceBuffer> = InMemoryTraceBuffer::start(
            config.trace_idle_window(),
            Arc::clone(&forwarding_sink) as Arc<dyn TraceSink>,
        );

        let ingest = Arc::new(IngestCoordinator::new(
            Arc::clone(&engine),
            Arc::clone(&trace_buffer),
            Arc::clone(&violations),
        ));
        forwarding_sink.bind(Arc::clone(&ingest) as Arc<dyn TraceSink>);

        Ok(Self {
            administrator,
            ingest,
            trace_buffer,
            violations,
            engine,
        })
    }
}

/// Reload every durable rule into the engine and seed its FSM entry as
/// `Persisted`, so a fresh process's `Engine.List()` equals `Store.List()`
/// before the first administrative operation runs.
///
/// A rule whose expression no longer compiles (e.g. hand-edited storage) is
/// skipped with a warning rather than aborting startup, mirroring the
/// store's own "skip corrupt rows" failure model.
async fn reload_from_store(store: &Arc<dyn RuleStore>, engine: &Arc<dyn RuleEngine>, registry: &Arc<FsmRegistry>) -> Result<()> {
    for rule in store.list(&RuleFilter::default()).await? {
        if let Err(err) = engine.load(&rule).await {
            tracing::warn!(rule_id = %rule.id, error = %err, "skipping rule that failed to recompile on startup");
            continue;
        }
        let fsm = registry.get_or_create(&rule.id);
        fsm.apply(RuleEvent::Create)?;
        fsm.apply(RuleEvent::Validate)?;
        fsm.apply(RuleEvent::Compile)?;
        fsm.apply(RuleEvent::Persist)?;
    }
    Ok(())
}

/// Forwards `on_trace_complete` to a target bound after construction,
/// resolving the construction-order cycle between the trace buffer and the
/// ingest coordinator.
struct ForwardingSink {
    target: OnceLock<Arc<dyn TraceSink>>,
}

impl ForwardingSink {
    fn new() -> Self {
        Self { target: OnceLock::new() }
    }

    fn bind(&self, target: Arc<dyn TraceSink>) {
        let _ = self.target.set(target);
    }
}

#[async_trait::async_trait]
impl TraceSink for ForwardingSink {
    async fn on_trace_complete(&self, trace_id: String, trace: TraceSlot) {
        if let Some(target) = self.target.get() {
            target.on_trace_complete(trace_id, trace).await;
        } else {
            tracing::warn!(trace_id, "trace flushed before ingest coordinator was bound, dropping");
        }
    }
}
