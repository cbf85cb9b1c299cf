//! roam-rec library interface
//!
//! Exposes the recommendation pipeline and HTTP surface for integration
//! testing.

pub mod api;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod queue;
pub mod storage;
pub mod types;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::Recommender;

use axum::Router;
use chrono::{DateTime, Utc};
use roam_common::events::EventBus;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The recommendation pipeline
    pub recommender: Arc<Recommender>,
    /// Model request queue, absent when no model is configured
    pub queue: Option<Arc<queue::RequestQueue>>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        recommender: Arc<Recommender>,
        queue: Option<Arc<queue::RequestQueue>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            recommender,
            queue,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::recommend_routes())
        .route("/events", get(api::event_stream))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
