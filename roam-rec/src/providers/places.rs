//! Venue-verification provider client
//!
//! **[REC-INT-030]** Queries the deployment's places-verification service
//! for venues near a point. Retry and concurrency policy live in the
//! `VenueVerifier`; this client does one call with one timeout.

use super::{map_status, map_transport_error, parse_retry_after, ProviderError};
use crate::types::{GeoPoint, VenueRecord};
use async_trait::async_trait;
use roam_common::config::PlacesConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = "roam-rec/0.1.0 (https://github.com/roam/roam)";

/// Capability interface for venue verification
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Search venues around `center` within `radius_meters`, optionally
    /// narrowed by category hints
    async fn search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
        category_hints: &[String],
    ) -> Result<Vec<VenueRecord>, ProviderError>;

    fn provider_id(&self) -> &'static str;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    lat: f64,
    lng: f64,
    radius_meters: u32,
    categories: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<VenueRecord>,
}

/// HTTP places client
pub struct HttpPlacesClient {
    http_client: reqwest::Client,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPlacesClient {
    pub fn new(config: &PlacesConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let rps = config.requests_per_second.max(1);
        // Safe: max(1) above guarantees non-zero
        let quota = governor::Quota::per_second(std::num::NonZeroU32::new(rps).unwrap());
        let rate_limiter = governor::RateLimiter::direct(quota);

        Ok(Self {
            http_client,
            rate_limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl PlacesProvider for HttpPlacesClient {
    async fn search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
        category_hints: &[String],
    ) -> Result<Vec<VenueRecord>, ProviderError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/search", self.base_url);

        tracing::debug!(
            lat = center.lat,
            lng = center.lng,
            radius_meters,
            hints = ?category_hints,
            "Querying places provider"
        );

        let mut builder = self.http_client.post(&url).json(&SearchRequest {
            lat: center.lat,
            lng: center.lng,
            radius_meters,
            categories: category_hints,
        });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            return Err(map_status(status.as_u16(), retry_after));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Validation(e.to_string()))?;

        tracing::debug!(results = search.results.len(), "Places search complete");

        Ok(search.results)
    }

    fn provider_id(&self) -> &'static str {
        "places"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = PlacesConfig::default();
        let client = HttpPlacesClient::new(&config, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_search_response_parses() {
        let json = r#"{
            "results": [
                {
                    "id": "pl-1",
                    "name": "Herastrau Park",
                    "coords": {"lat": 44.47, "lng": 26.08},
                    "tags": ["park", "nature"],
                    "rating": 4.6,
                    "rating_count": 1200
                }
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].id, "pl-1");
        assert_eq!(parsed.results[0].rating, Some(4.6));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"results":[{"id":"x","name":"Y","coords":{"lat":0.0,"lng":0.0},"rating":null,"rating_count":null}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.results[0].tags.is_empty());
        assert!(parsed.results[0].rating.is_none());
    }
}
