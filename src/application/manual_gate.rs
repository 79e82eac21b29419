// Manual control gate - decides which mode/override commands may be sent
use crate::application::dispatcher::{CommandDispatcher, CommandError, Dispatched};
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::tank::{ConfigPatch, ControlMode, ManualOverride};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Requested mode already held; nothing sent.
    Unchanged,
    Sent(Dispatched),
}

pub struct ManualControlGate {
    dispatcher: Arc<CommandDispatcher>,
    store: Arc<TelemetryStore>,
    /// One lock per override field, held across read-modify-write-reconcile.
    toggle_locks: [Mutex<()>; 5],
}

impl ManualControlGate {
    pub fn new(dispatcher: Arc<CommandDispatcher>, store: Arc<TelemetryStore>) -> Self {
        Self {
            dispatcher,
            store,
            toggle_locks: Default::default(),
        }
    }

    pub fn mode(&self) -> Option<ControlMode> {
        self.store.config().map(|c| c.control_mode)
    }

    pub async fn set_mode(&self, mode: ControlMode) -> Result<GateOutcome, CommandError> {
        let current = self.mode().ok_or(CommandError::ConfigUnavailable)?;
        if current == mode {
            return Ok(GateOutcome::Unchanged);
        }
        tracing::info!(from = ?current, to = ?mode, "switching control mode");
        let dispatched = self.dispatcher.submit(ConfigPatch::mode(mode)).await?;
        Ok(GateOutcome::Sent(dispatched))
    }

    /// Send the negation of the last known value of `field`. Suppressed
    /// unless the held config is in MANUAL mode; the backend enforces the
    /// same rule independently.
    pub async fn toggle(&self, field: ManualOverride) -> Result<GateOutcome, CommandError> {
        let _serialized = self.toggle_locks[field.index()].lock().await;

        let config = self.store.config().ok_or(CommandError::ConfigUnavailable)?;
        if !config.is_manual() {
            tracing::debug!(field = field.field(), "toggle ignored in AUTO mode");
            return Err(CommandError::ManualModeRequired);
        }

        let next = !field.current(&config);
        let dispatched = self.dispatcher.submit(field.patch(next)).await?;
        Ok(GateOutcome::Sent(dispatched))
    }
}
