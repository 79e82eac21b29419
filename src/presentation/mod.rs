// Presentation layer - local supervisory HTTP API
pub mod app_state;
pub mod handlers;
