// Command dispatcher - validates partial config updates, submits them, then reconciles
use crate::application::control_backend::{BackendError, ControlBackend};
use crate::application::synchronizer::PollingSynchronizer;
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::tank::{nearest_capacity, ConfigPatch, ConfigUpdate, TankConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Override toggles are only sent while the tank is in manual mode.
    #[error("manual overrides require MANUAL control mode")]
    ManualModeRequired,

    #[error("configuration not loaded yet")]
    ConfigUnavailable,

    #[error("nothing to update")]
    EmptyUpdate,

    #[error("backend rejected the update (status {status})")]
    Rejected { status: u16, body: String },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<BackendError> for CommandError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, body } => CommandError::Rejected { status, body },
            other => CommandError::Unavailable(other.to_string()),
        }
    }
}

/// A confirmed write.
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Config as returned by the backend for the PATCH.
    pub accepted: TankConfig,
    /// Whether the follow-up fetch installed a newer config.
    pub reconciled: bool,
}

pub struct CommandDispatcher {
    backend: Arc<dyn ControlBackend>,
    store: Arc<TelemetryStore>,
    synchronizer: Arc<PollingSynchronizer>,
}

impl CommandDispatcher {
    pub fn new(
        backend: Arc<dyn ControlBackend>,
        store: Arc<TelemetryStore>,
        synchronizer: Arc<PollingSynchronizer>,
    ) -> Self {
        Self {
            backend,
            store,
            synchronizer,
        }
    }

    /// Validate against the held config and normalize the update. No I/O.
    pub fn prepare(&self, update: impl Into<ConfigUpdate>) -> Result<ConfigPatch, CommandError> {
        let update = update.into();
        let capacity = update.capacity_l.map(|requested| {
            let coerced = nearest_capacity(requested.round());
            if f64::from(coerced) != requested {
                tracing::debug!(requested, coerced, "capacity coerced to nearest option");
            }
            coerced
        });
        let patch = update.with_capacity(capacity);
        if patch.is_empty() {
            return Err(CommandError::EmptyUpdate);
        }

        if let Some(temp) = patch.temp_set_c {
            self.check_setpoint(temp)?;
        }

        if patch.touches_overrides() {
            let config = self.store.config().ok_or(CommandError::ConfigUnavailable)?;
            if !config.is_manual() {
                tracing::debug!("suppressing override write outside MANUAL mode");
                return Err(CommandError::ManualModeRequired);
            }
        }

        Ok(patch)
    }

    /// Setpoint must be finite and inside the bounds of the held config.
    pub fn check_setpoint(&self, temp: f64) -> Result<(), CommandError> {
        let config = self.store.config().ok_or(CommandError::ConfigUnavailable)?;
        if config.setpoint_in_bounds(temp) {
            return Ok(());
        }
        Err(CommandError::Validation {
            field: "temp_set_c",
            message: format!(
                "setpoint must be between {} °C and {} °C",
                config.temp_min_c, config.temp_max_c
            ),
        })
    }

    /// Send the update and, once confirmed, fetch the config out of cycle.
    /// Nothing is written locally before the backend confirms.
    pub async fn submit(&self, update: impl Into<ConfigUpdate>) -> Result<Dispatched, CommandError> {
        let patch = self.prepare(update)?;

        let accepted = match self.backend.patch_config(&patch).await {
            Ok(config) => config,
            Err(e) if e.is_rejection() => {
                tracing::warn!(error = %e, "config update rejected by backend");
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "config update not delivered");
                return Err(e.into());
            }
        };
        tracing::info!(?patch, "config update confirmed");

        // Reconciled once the held config is at least as new as the accepted one.
        let reconciled = match self.synchronizer.reconcile_config().await {
            Ok(_) => self
                .store
                .config()
                .is_some_and(|held| held.updated_at >= accepted.updated_at),
            Err(e) => {
                tracing::warn!(error = %e, "reconciliation after update failed, next poll retries");
                false
            }
        };

        Ok(Dispatched { accepted, reconciled })
    }
}
