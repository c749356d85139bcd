//! Trace assembly and idle-flush scheduling (C5).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use std::sync::Mutex as StdMutex;

use ruleguard_domain::entities::{Span, TraceSlot};
use ruleguard_domain::error::Result;
use ruleguard_domain::ports::{TraceBuffer, TraceSink};

/// A [`TraceBuffer`] backed by a concurrent map of per-trace slots, drained
/// by a single background scheduler task on a fixed interval.
pub struct InMemoryTraceBuffer {
    slots: Arc<DashMap<String, Mutex<TraceSlot>>>,
    window: chrono::Duration,
    cancel: CancellationToken,
    scheduler: StdMutex<Option<JoinHandle<()>>>,
}

impl InMemoryTraceBuffer {
    /// Construct a buffer with the given idle window and start its
    /// background scheduler, which flushes idle traces to `sink` every
    /// `window / 2`.
    #[must_use]
    pub fn start(window: StdDuration, sink: Arc<dyn TraceSink>) -> Arc<Self> {
        let slots: Arc<DashMap<String, Mutex<TraceSlot>>> = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Self {
            slots: Arc::clone(&slots),
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::seconds(3)),
            cancel: cancel.clone(),
            scheduler: StdMutex::new(None),
        });

        let tick = (window / 2).max(StdDuration::from_millis(100));
        let handle = {
            let slots = Arc::clone(&slots);
            let window = buffer.window;
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            Self::drain_all(&slots, &sink).await;
                            break;
                        }
                        _ = interval.tick() => {
                            Self::drain_idle(&slots, window, &sink).await;
                        }
                    }
                }
            })
        };

        *buffer.scheduler.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);

        buffer
    }

    async fn drain_idle(slots: &DashMap<String, Mutex<TraceSlot>>, window: chrono::Duration, sink: &Arc<dyn TraceSink>) {
        let now = Utc::now();
        let idle_ids: Vec<String> = {
            let mut ids = Vec::new();
            for entry in slots.iter() {
                if entry.value().lock().await.is_idle(window, now) {
                    ids.push(entry.key().clone());
                }
            }
            ids
        };
        for trace_id in idle_ids {
            if let Some((_, slot)) = slots.remove(&trace_id) {
                let taken = std::mem::take(&mut *slot.lock().await);
                sink.on_trace_complete(trace_id, taken).await;
            }
        }
    }

    async fn drain_all(slots: &DashMap<String, Mutex<TraceSlot>>, sink: &Arc<dyn TraceSink>) {
        let ids: Vec<String> = slots.iter().map(|entry| entry.key().clone()).collect();
        for trace_id in ids {
            if let Some((_, slot)) = slots.remove(&trace_id) {
                let taken = std::mem::take(&mut *slot.lock().await);
                sink.on_trace_complete(trace_id, taken).await;
            }
        }
    }
}

#[async_trait]
impl TraceBuffer for InMemoryTraceBuffer {
    async fn ingest(&self, span: Span) -> Result<()> {
        let slot = self.slots.entry(span.trace_id.clone()).or_default();
        slot.lock().await.push(span);
        Ok(())
    }

    async fn active_trace_count(&self) -> usize {
        self.slots.len()
    }

    async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
