// Supervisor session - owns the poll task and wires the read and write paths
use crate::application::control_backend::ControlBackend;
use crate::application::dispatcher::{CommandDispatcher, CommandError, Dispatched};
use crate::application::manual_gate::ManualControlGate;
use crate::application::synchronizer::{PollSettings, PollingSynchronizer};
use crate::application::telemetry_store::{TelemetrySnapshot, TelemetryStore};
use crate::domain::draft::{ConfigDraft, DraftEdit};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

struct Poller {
    lifecycle: Lifecycle,
    handle: Option<JoinHandle<()>>,
}

pub struct SupervisorSession {
    store: Arc<TelemetryStore>,
    synchronizer: Arc<PollingSynchronizer>,
    dispatcher: Arc<CommandDispatcher>,
    gate: ManualControlGate,
    draft: Mutex<Option<ConfigDraft>>,
    poller: Mutex<Poller>,
}

impl SupervisorSession {
    pub fn new(backend: Arc<dyn ControlBackend>, settings: PollSettings) -> Self {
        let store = Arc::new(TelemetryStore::new());
        let synchronizer = Arc::new(PollingSynchronizer::new(backend.clone(), store.clone(), settings));
        let dispatcher = Arc::new(CommandDispatcher::new(backend, store.clone(), synchronizer.clone()));
        let gate = ManualControlGate::new(dispatcher.clone(), store.clone());
        Self {
            store,
            synchronizer,
            dispatcher,
            gate,
            draft: Mutex::new(None),
            poller: Mutex::new(Poller {
                lifecycle: Lifecycle::Idle,
                handle: None,
            }),
        }
    }

    /// Start polling; the first tick also loads the config. No-op while
    /// running; a stopped session stays stopped.
    pub fn start(&self) {
        let mut poller = lock(&self.poller);
        match poller.lifecycle {
            Lifecycle::Running => return,
            Lifecycle::Stopped => {
                tracing::warn!("session already stopped, not restarting");
                return;
            }
            Lifecycle::Idle => {}
        }

        poller.handle = Some(self.synchronizer.spawn());
        poller.lifecycle = Lifecycle::Running;
        tracing::info!("supervisor session started");
    }

    /// Stop polling. Requests already in flight may finish but their
    /// results are dropped.
    pub fn stop(&self) {
        let mut poller = lock(&self.poller);
        self.store.close();
        if let Some(handle) = poller.handle.take() {
            handle.abort();
        }
        let was_running = poller.lifecycle == Lifecycle::Running;
        poller.lifecycle = Lifecycle::Stopped;
        if was_running {
            tracing::info!("supervisor session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.poller).lifecycle == Lifecycle::Running
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.store.subscribe()
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn gate(&self) -> &ManualControlGate {
        &self.gate
    }

    /// The pending edit, seeded from the confirmed config when none exists.
    pub fn draft(&self) -> Option<ConfigDraft> {
        let mut draft = lock(&self.draft);
        if draft.is_none() {
            *draft = self.store.config().map(|c| ConfigDraft::seed(&c));
        }
        draft.clone()
    }

    pub fn edit_draft(&self, edit: &DraftEdit) -> Result<ConfigDraft, CommandError> {
        let mut draft = lock(&self.draft);
        if draft.is_none() {
            *draft = self.store.config().map(|c| ConfigDraft::seed(&c));
        }
        let current = draft.as_mut().ok_or(CommandError::ConfigUnavailable)?;
        current.apply(edit);
        Ok(current.clone())
    }

    /// Dispatch the pending edit. It is discarded only once the update is
    /// confirmed and reconciled, so a failed submit can be retried as is.
    pub async fn submit_draft(&self) -> Result<Dispatched, CommandError> {
        let draft = self.draft().ok_or(CommandError::ConfigUnavailable)?;
        // Bounds apply to the value as edited, before rounding.
        self.dispatcher.check_setpoint(draft.temp_set_c)?;
        let dispatched = self.dispatcher.submit(draft.to_patch()).await?;
        if dispatched.reconciled {
            let mut held = lock(&self.draft);
            if held.as_ref() == Some(&draft) {
                *held = None;
            }
        }
        Ok(dispatched)
    }
}

impl Drop for SupervisorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
