//! Shared test helpers: scripted provider mocks and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use roam_rec::providers::{
    ModelProvider, ModelRequest, ModelResponse, PlacesProvider, ProviderError,
};
use roam_rec::types::{GeoPoint, VenueRecord};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

pub const BUCHAREST: GeoPoint = GeoPoint {
    lat: 44.4268,
    lng: 26.1025,
};

/// Model mock that replays a script of responses, then a fallback
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    /// Served once the script is exhausted; None = always unavailable
    fallback: Option<String>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedModel {
    /// Every call fails with a 503
    pub fn always_failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Replay the given results in order, then fail with 503
    pub fn with_script(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Replay the given results in order, then keep answering `fallback`
    pub fn with_script_then_ok(
        script: Vec<Result<String, ProviderError>>,
        fallback: &str,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Some(fallback.to_string()),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted.map(|content| ModelResponse { content });
        }
        match &self.fallback {
            Some(content) => Ok(ModelResponse {
                content: content.clone(),
            }),
            None => Err(ProviderError::Unavailable { status: 503 }),
        }
    }

    fn provider_id(&self) -> &'static str {
        "model"
    }
}

/// Places mock that always returns the same venue set
pub struct StaticPlaces {
    venues: Vec<VenueRecord>,
    calls: AtomicUsize,
}

impl StaticPlaces {
    pub fn new(venues: Vec<VenueRecord>) -> Self {
        Self {
            venues,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlacesProvider for StaticPlaces {
    async fn search(
        &self,
        _center: GeoPoint,
        _radius_meters: u32,
        _category_hints: &[String],
    ) -> Result<Vec<VenueRecord>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.venues.clone())
    }

    fn provider_id(&self) -> &'static str {
        "places"
    }
}

/// Venue fixture near the Bucharest origin
pub fn venue(id: &str, tag: &str, rating: f32, rating_count: u32) -> VenueRecord {
    VenueRecord {
        id: id.to_string(),
        name: format!("Venue {}", id),
        coords: GeoPoint {
            lat: 44.44,
            lng: 26.10,
        },
        tags: vec![tag.to_string()],
        rating: Some(rating),
        rating_count: Some(rating_count),
    }
}
