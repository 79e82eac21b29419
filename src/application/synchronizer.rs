// Polling synchronizer - recurring telemetry fetch with ordering protection
use crate::application::control_backend::{BackendError, ControlBackend};
use crate::application::telemetry_store::{Applied, TelemetryStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub events_limit: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            events_limit: 50,
        }
    }
}

/// What a single tick did with each entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A previous fetch of this entity is still outstanding.
    Skipped,
    Failed,
    Applied(Applied),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub state: FetchOutcome,
    pub events: FetchOutcome,
    /// `None` when a config was already held and none was requested.
    pub config: Option<FetchOutcome>,
}

/// Held while a fetch of one entity is outstanding.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PollingSynchronizer {
    backend: Arc<dyn ControlBackend>,
    store: Arc<TelemetryStore>,
    settings: PollSettings,
    state_in_flight: AtomicBool,
    events_in_flight: AtomicBool,
    config_in_flight: AtomicBool,
}

impl PollingSynchronizer {
    pub fn new(backend: Arc<dyn ControlBackend>, store: Arc<TelemetryStore>, settings: PollSettings) -> Self {
        Self {
            backend,
            store,
            settings,
            state_in_flight: AtomicBool::new(false),
            events_in_flight: AtomicBool::new(false),
            config_in_flight: AtomicBool::new(false),
        }
    }

    /// Start the recurring poll. The first tick fires immediately; every tick
    /// runs on its own task so a slow backend never holds up the timer.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_ms = this.settings.interval.as_millis() as u64, "telemetry polling started");
            loop {
                ticker.tick().await;
                if !this.store.is_live() {
                    break;
                }
                let tick = Arc::clone(&this);
                tokio::spawn(async move {
                    tick.poll_once().await;
                });
            }
        })
    }

    /// Fetch state and the recent events window concurrently, plus the
    /// config for as long as none has been loaded.
    pub async fn poll_once(&self) -> TickReport {
        let config = async {
            match self.store.config() {
                Some(_) => None,
                None => Some(self.refresh_config().await),
            }
        };
        let (state, events, config) = tokio::join!(self.fetch_state(), self.fetch_events(), config);

        let failed = matches!(state, FetchOutcome::Failed)
            || matches!(events, FetchOutcome::Failed)
            || matches!(config, Some(FetchOutcome::Failed));
        let completed = matches!(state, FetchOutcome::Applied(_)) || matches!(events, FetchOutcome::Applied(_));
        if failed {
            self.store.mark_degraded();
        } else if completed {
            self.store.mark_connected();
        }

        TickReport { state, events, config }
    }

    /// Initial config load; skipped while another load is outstanding.
    pub async fn refresh_config(&self) -> FetchOutcome {
        let Some(_guard) = InFlight::acquire(&self.config_in_flight) else {
            tracing::debug!("config fetch still in flight, skipping");
            return FetchOutcome::Skipped;
        };
        match self.reconcile_config().await {
            Ok(applied) => FetchOutcome::Applied(applied),
            Err(_) => FetchOutcome::Failed,
        }
    }

    /// Out-of-cycle config fetch. Always issued, since a fetch already in
    /// flight may predate the write being confirmed.
    pub async fn reconcile_config(&self) -> Result<Applied, BackendError> {
        match self.backend.fetch_config().await {
            Ok(config) => {
                let applied = self.store.apply_config(config);
                self.store.mark_connected();
                Ok(applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "config fetch failed");
                self.store.mark_degraded();
                Err(e)
            }
        }
    }

    async fn fetch_state(&self) -> FetchOutcome {
        let Some(_guard) = InFlight::acquire(&self.state_in_flight) else {
            tracing::debug!("state fetch still in flight, skipping tick");
            return FetchOutcome::Skipped;
        };
        match self.backend.fetch_state().await {
            Ok(state) => FetchOutcome::Applied(self.store.apply_state(state)),
            Err(e) => {
                tracing::warn!(error = %e, "state poll failed, retrying next tick");
                FetchOutcome::Failed
            }
        }
    }

    async fn fetch_events(&self) -> FetchOutcome {
        let Some(_guard) = InFlight::acquire(&self.events_in_flight) else {
            tracing::debug!("events fetch still in flight, skipping tick");
            return FetchOutcome::Skipped;
        };
        let ticket = self.store.next_events_ticket();
        match self.backend.fetch_events(self.settings.events_limit).await {
            Ok(events) => FetchOutcome::Applied(self.store.apply_events(ticket, events)),
            Err(e) => {
                tracing::warn!(error = %e, "events poll failed, retrying next tick");
                FetchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::FakeBackend;
    use crate::domain::tank::fixtures;

    fn synchronizer(backend: Arc<FakeBackend>) -> (Arc<PollingSynchronizer>, Arc<TelemetryStore>) {
        let store = Arc::new(TelemetryStore::new());
        let sync = Arc::new(PollingSynchronizer::new(backend, store.clone(), PollSettings::default()));
        (sync, store)
    }

    #[tokio::test]
    async fn test_poll_installs_state_and_events() {
        let backend = Arc::new(FakeBackend::new());
        let (sync, store) = synchronizer(backend.clone());

        let report = sync.poll_once().await;

        assert_eq!(report.state, FetchOutcome::Applied(Applied::Installed));
        assert_eq!(report.events, FetchOutcome::Applied(Applied::Installed));
        let snap = store.snapshot();
        assert!(snap.state.is_some());
        assert_eq!(snap.events.len(), 2);
        assert!(!snap.loading);
        assert_eq!(backend.events_limits(), vec![50]);
    }

    #[tokio::test]
    async fn test_failure_degrades_then_recovers() {
        let backend = Arc::new(FakeBackend::new());
        let (sync, store) = synchronizer(backend.clone());
        sync.poll_once().await;
        let before = store.snapshot().state.unwrap();

        backend.set_offline(true);
        let report = sync.poll_once().await;
        assert_eq!(report.state, FetchOutcome::Failed);
        let snap = store.snapshot();
        assert!(snap.degraded);
        assert_eq!(snap.state.unwrap(), before);

        backend.set_offline(false);
        sync.poll_once().await;
        let snap = store.snapshot();
        assert!(!snap.degraded);
        assert!(snap.state.unwrap().ts > before.ts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_state_delay(Duration::from_millis(2500));
        let (sync, _store) = synchronizer(backend.clone());

        let slow = tokio::spawn({
            let sync = sync.clone();
            async move { sync.poll_once().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = sync.poll_once().await;
        assert_eq!(report.state, FetchOutcome::Skipped);
        assert_eq!(report.events, FetchOutcome::Applied(Applied::Installed));

        let report = slow.await.unwrap();
        assert_eq!(report.state, FetchOutcome::Applied(Applied::Installed));
        assert_eq!(backend.state_calls(), 1);
    }

    #[tokio::test]
    async fn test_config_retried_each_tick_until_loaded() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_config_fetch(true);
        let (sync, store) = synchronizer(backend.clone());

        let report = sync.poll_once().await;
        assert_eq!(report.state, FetchOutcome::Applied(Applied::Installed));
        assert_eq!(report.config, Some(FetchOutcome::Failed));
        let snap = store.snapshot();
        assert!(snap.degraded);
        assert!(snap.config.is_none());

        backend.fail_config_fetch(false);
        let report = sync.poll_once().await;
        assert_eq!(report.config, Some(FetchOutcome::Applied(Applied::Installed)));
        assert!(!store.snapshot().degraded);

        let report = sync.poll_once().await;
        assert_eq!(report.config, None);
        assert_eq!(backend.config_calls(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_discards_older_config() {
        let backend = Arc::new(FakeBackend::new());
        let (sync, store) = synchronizer(backend.clone());
        store.apply_config(fixtures::config(100));

        let applied = sync.reconcile_config().await.unwrap();

        assert_eq!(applied, Applied::Stale);
        assert_eq!(store.config().unwrap().updated_at, fixtures::at(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_polls_every_interval_until_closed() {
        let backend = Arc::new(FakeBackend::new());
        let (sync, store) = synchronizer(backend.clone());

        let handle = sync.spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.state_calls(), 1);
        assert_eq!(backend.events_calls(), 1);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(backend.state_calls(), 3);

        store.close();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        handle.await.unwrap();
        assert_eq!(backend.state_calls(), 3);
    }
}
