//! roam-rec - Vibe Recommendation Microservice
//!
//! **Module Identity:**
//! - Name: roam-rec (Recommender)
//! - Port: 5810
//!
//! Turns a free-text "vibe" plus location and time constraints into a
//! short, diverse, verified, ranked list of concrete venues. Degrades
//! gracefully: with no model configured the service still answers with
//! rating-sorted venues.

use anyhow::Result;
use roam_common::config;
use roam_common::events::EventBus;
use roam_rec::providers::{HttpModelClient, HttpPlacesClient};
use roam_rec::queue::{QueueConfig, RequestQueue};
use roam_rec::storage::MemoryStore;
use roam_rec::{build_router, AppState, Recommender};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let toml_config = config::load_config()?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting roam-rec (Recommender) microservice");
    info!("Port: 5810");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Model provider is optional: without a key the pipeline runs on its
    // deterministic fallbacks
    let queue = match config::resolve_model_api_key(&toml_config) {
        Ok(api_key) => match HttpModelClient::new(&toml_config.model, api_key) {
            Ok(client) => {
                info!("Model client initialized ({})", toml_config.model.model);
                Some(Arc::new(RequestQueue::new(
                    Arc::new(client),
                    QueueConfig::from_tunables(&toml_config.tunables),
                )))
            }
            Err(e) => {
                warn!("Failed to initialize model client, running degraded: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("{}", e);
            warn!("No model configured - interpretation and curation will use fallbacks");
            None
        }
    };

    let places_api_key = config::resolve_places_api_key(&toml_config).ok();
    let places = Arc::new(
        HttpPlacesClient::new(&toml_config.places, places_api_key)
            .map_err(|e| anyhow::anyhow!("Failed to initialize places client: {}", e))?,
    );
    info!("Places client initialized ({})", toml_config.places.base_url);

    // The deployment's storage collaborator plugs in here; the in-memory
    // store keeps a keyless local instance fully functional
    let store = Arc::new(MemoryStore::new());

    let event_bus = EventBus::new(100);

    let recommender = Arc::new(Recommender::new(
        queue.clone(),
        places,
        store.clone(),
        store,
        toml_config.tunables.clone(),
        Some(event_bus.clone()),
    ));

    let state = AppState::new(recommender, queue, event_bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5810").await?;
    info!("Listening on http://127.0.0.1:5810");
    info!("Health check: http://127.0.0.1:5810/health");

    axum::serve(listener, app).await?;

    Ok(())
}
