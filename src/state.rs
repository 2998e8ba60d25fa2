use crate::config::AppConfig;
use crate::store::QuoteStore;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Performance counters, lock-free, logged periodically.
#[derive(Debug, Default)]
pub struct Counters {
    pub sessions_opened: AtomicU64,
    pub sessions_closed: AtomicU64,
    pub requests_served: AtomicU64,
    pub read_failures: AtomicU64,
    pub persist_failures: AtomicU64,
}

impl Counters {
    pub fn log_snapshot(&self) {
        tracing::info!(
            sessions_opened = self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed = self.sessions_closed.load(Ordering::Relaxed),
            requests_served = self.requests_served.load(Ordering::Relaxed),
            read_failures = self.read_failures.load(Ordering::Relaxed),
            persist_failures = self.persist_failures.load(Ordering::Relaxed),
            "counters"
        );
    }
}

/// Shared handles for all sessions. Constructed once at startup and
/// passed explicitly; there is no other cross-session mutable state.
pub struct AppState {
    pub cfg: AppConfig,
    pub store: QuoteStore,
    pub counters: Counters,
}

impl AppState {
    pub fn new(cfg: AppConfig, store: QuoteStore) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            store,
            counters: Counters::default(),
        })
    }
}
