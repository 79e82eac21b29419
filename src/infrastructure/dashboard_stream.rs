// Server-sent dashboard updates driven by telemetry model changes
use crate::application::telemetry_store::TelemetrySnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::stream::Stream;
use std::convert::Infallible;
use tokio::sync::watch;

/// One `dashboard` event per model change, starting with the current view.
pub fn dashboard_events(
    mut rx: watch::Receiver<TelemetrySnapshot>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            let dashboard = rx.borrow_and_update().dashboard();
            match Event::default().event("dashboard").json_data(&dashboard) {
                Ok(event) => {
                    yield Ok::<Event, Infallible>(event);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode dashboard event");
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

pub fn stream_from_receiver(rx: watch::Receiver<TelemetrySnapshot>) -> impl IntoResponse {
    Sse::new(dashboard_events(rx)).keep_alive(KeepAlive::default())
}
