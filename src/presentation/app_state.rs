// Application state for HTTP handlers
use crate::application::session::SupervisorSession;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SupervisorSession>,
}
