//! SSE event stream endpoint

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams pipeline progress events to monitoring UIs.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    roam_common::sse::create_event_sse_stream(state.event_bus.clone(), "roam-rec")
}
