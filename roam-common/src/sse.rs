//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE stream construction for ROAM services.

use crate::events::EventBus;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info};

/// Create an SSE stream that forwards pipeline events from the bus
///
/// Sends an initial `ConnectionStatus` event, then every broadcast pipeline
/// event serialized as JSON, with comment heartbeats so proxies keep the
/// connection open.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     roam_common::sse::create_event_sse_stream(state.event_bus.clone(), "roam-rec")
/// }
/// ```
pub fn create_event_sse_stream(
    bus: EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    match serde_json::to_string(&event) {
                        Ok(json) => yield Ok(Event::default().event("PipelineEvent").data(json)),
                        Err(e) => debug!("SSE: failed to serialize event: {}", e),
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!("SSE: subscriber lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    debug!("SSE: event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
