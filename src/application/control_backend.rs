// Port to the control backend that owns the physical loop
use crate::domain::tank::{ConfigPatch, EventLog, TankConfig, TankState};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Timeout, refused connection or any other transport failure.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success status.
    #[error("backend rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("undecodable backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Rejected { .. })
    }
}

#[async_trait]
pub trait ControlBackend: Send + Sync {
    /// `GET /state/`
    async fn fetch_state(&self) -> Result<TankState, BackendError>;

    /// `GET /config/`
    async fn fetch_config(&self) -> Result<TankConfig, BackendError>;

    /// `GET /events/?limit=N`, most recent first
    async fn fetch_events(&self, limit: u32) -> Result<Vec<EventLog>, BackendError>;

    /// `PATCH /config/` with only the present fields
    async fn patch_config(&self, patch: &ConfigPatch) -> Result<TankConfig, BackendError>;
}
