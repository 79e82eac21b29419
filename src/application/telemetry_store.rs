// Telemetry model - the single in-memory holder of the latest known tank data
use crate::domain::display::{ConnectionView, Dashboard};
use crate::domain::tank::{EventLog, TankConfig, TankState};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of offering a fetched entity to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Installed,
    /// Marker not newer than the held one; dropped.
    Stale,
    /// Session torn down; dropped.
    Closed,
}

/// Immutable view of the model. Each entity is replaced as a unit.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub state: Option<Arc<TankState>>,
    pub config: Option<Arc<TankConfig>>,
    pub events: Arc<Vec<EventLog>>,
    pub degraded: bool,
    /// True until the first poll has completed either way.
    pub loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
    events_ticket: u64,
}

impl TelemetrySnapshot {
    fn initial() -> Self {
        Self {
            state: None,
            config: None,
            events: Arc::new(Vec::new()),
            degraded: false,
            loading: true,
            last_updated: None,
            events_ticket: 0,
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::build(
            self.state.as_deref(),
            self.config.as_deref(),
            &self.events,
            ConnectionView::new(self.degraded, self.loading, self.last_updated),
        )
    }
}

pub struct TelemetryStore {
    tx: watch::Sender<TelemetrySnapshot>,
    live: AtomicBool,
    tickets: AtomicU64,
}

impl TelemetryStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TelemetrySnapshot::initial());
        Self {
            tx,
            live: AtomicBool::new(true),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.tx.subscribe()
    }

    pub fn config(&self) -> Option<Arc<TankConfig>> {
        self.tx.borrow().config.clone()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop accepting results. Anything arriving afterwards is discarded.
    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Marker for an events request, taken when the request is issued.
    pub fn next_events_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn apply_state(&self, state: TankState) -> Applied {
        self.install("state", |snap| {
            if let Some(held) = &snap.state {
                if state.ts <= held.ts {
                    tracing::debug!(held = %held.ts, incoming = %state.ts, "discarding stale state");
                    return Applied::Stale;
                }
            }
            snap.state = Some(Arc::new(state));
            snap.last_updated = Some(Utc::now());
            Applied::Installed
        })
    }

    pub fn apply_config(&self, config: TankConfig) -> Applied {
        self.install("config", |snap| {
            if let Some(held) = &snap.config {
                if config.updated_at <= held.updated_at {
                    tracing::debug!(
                        held = %held.updated_at,
                        incoming = %config.updated_at,
                        "discarding stale config"
                    );
                    return Applied::Stale;
                }
            }
            snap.config = Some(Arc::new(config));
            Applied::Installed
        })
    }

    pub fn apply_events(&self, ticket: u64, events: Vec<EventLog>) -> Applied {
        self.install("events", |snap| {
            if ticket <= snap.events_ticket {
                tracing::debug!(held = snap.events_ticket, incoming = ticket, "discarding stale events");
                return Applied::Stale;
            }
            snap.events_ticket = ticket;
            snap.events = Arc::new(events);
            Applied::Installed
        })
    }

    pub fn mark_degraded(&self) {
        self.tx.send_if_modified(|snap| {
            if !self.is_live() {
                return false;
            }
            let changed = !snap.degraded || snap.loading;
            snap.degraded = true;
            snap.loading = false;
            changed
        });
    }

    /// Clears the degraded flag, except while no config has been loaded.
    pub fn mark_connected(&self) {
        self.tx.send_if_modified(|snap| {
            if !self.is_live() {
                return false;
            }
            let degraded = snap.degraded && snap.config.is_none();
            let changed = snap.degraded != degraded || snap.loading;
            snap.degraded = degraded;
            snap.loading = false;
            changed
        });
    }

    fn install<F>(&self, entity: &'static str, apply: F) -> Applied
    where
        F: FnOnce(&mut TelemetrySnapshot) -> Applied,
    {
        let mut outcome = Applied::Closed;
        self.tx.send_if_modified(|snap| {
            if !self.is_live() {
                return false;
            }
            outcome = apply(snap);
            outcome == Applied::Installed
        });
        if outcome == Applied::Closed {
            tracing::debug!(entity, "session closed, dropping late result");
        }
        outcome
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}
