//! HTTP API handlers

mod events;
mod health;
mod recommend;

pub use events::event_stream;
pub use health::health_routes;
pub use recommend::recommend_routes;
