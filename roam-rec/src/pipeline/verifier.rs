//! Venue verification
//!
//! **[REC-VER-010]** Queries the venue provider per (region, category)
//! pair under a bounded concurrency limit, normalizes results into
//! `VerifiedVenue`, deduplicates by place id across regions, and caches
//! listings by (region, category, radius). Emits no ordering guarantee —
//! ordering is the diversifier's and curator's job.

use super::diversifier::classify_sector;
use super::regions::haversine_km;
use crate::providers::{backoff_delay, PlacesProvider, ProviderError};
use crate::types::{CandidateRegion, Category, GeoPoint, VenueRecord, VerifiedVenue};
use futures::stream::{self, StreamExt};
use roam_common::cache::TtlCache;
use roam_common::Tunables;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Cache key for one provider listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub region_id: String,
    pub category: Option<Category>,
    pub radius_meters: u32,
}

/// Bounded-concurrency venue verification with TTL caching
pub struct VenueVerifier {
    provider: Arc<dyn PlacesProvider>,
    cache: TtlCache<ListingKey, Vec<VenueRecord>>,
    max_concurrency: usize,
    max_retries: u32,
    backoff_base_ms: u64,
    backoff_cap_ms: u64,
}

impl VenueVerifier {
    pub fn new(provider: Arc<dyn PlacesProvider>, tunables: &Tunables) -> Self {
        Self {
            provider,
            cache: TtlCache::new(Duration::from_secs(tunables.listing_cache_ttl_secs)),
            max_concurrency: tunables.verify_max_concurrency.max(1),
            max_retries: tunables.verify_max_retries,
            backoff_base_ms: tunables.verify_backoff_base_ms,
            backoff_cap_ms: tunables.queue_backoff_cap_ms,
        }
    }

    /// Verify venues for every (region, category) pair
    ///
    /// Per-pair failures are isolated: a failed listing contributes
    /// nothing rather than failing the request.
    pub async fn verify(
        &self,
        origin: GeoPoint,
        regions: &[CandidateRegion],
        categories: &[Category],
        radius_meters: u32,
    ) -> Vec<VerifiedVenue> {
        let mut queries: Vec<(CandidateRegion, Option<Category>)> = Vec::new();
        for region in regions {
            if categories.is_empty() {
                // No category signal: one generic query per region
                queries.push((region.clone(), None));
            } else {
                for category in categories {
                    queries.push((region.clone(), Some(*category)));
                }
            }
        }

        let listings: Vec<Vec<VenueRecord>> = stream::iter(queries)
            .map(|(region, category)| self.fetch_listing(region, category, radius_meters))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut deduped: HashMap<String, VerifiedVenue> = HashMap::new();
        for record in listings.into_iter().flatten() {
            deduped.entry(record.id.clone()).or_insert_with(|| {
                let sector = classify_sector(&record.tags, &record.name);
                VerifiedVenue {
                    place_id: record.id,
                    name: record.name,
                    coords: record.coords,
                    rating: record.rating,
                    rating_count: record.rating_count,
                    sector,
                    distance_km: haversine_km(origin, record.coords),
                    source_provider: self.provider.provider_id().to_string(),
                }
            });
        }

        debug!(venues = deduped.len(), "Venue verification complete");
        deduped.into_values().collect()
    }

    /// Fetch one listing, serving from cache within the TTL
    async fn fetch_listing(
        &self,
        region: CandidateRegion,
        category: Option<Category>,
        radius_meters: u32,
    ) -> Vec<VenueRecord> {
        let key = ListingKey {
            region_id: region.id.clone(),
            category,
            radius_meters,
        };

        if let Some(cached) = self.cache.get(&key).await {
            debug!(region = %region.id, ?category, "Listing served from cache");
            return cached;
        }

        let hints: Vec<String> = category
            .map(|c| vec![c.as_str().to_string()])
            .unwrap_or_default();

        let mut attempt: u32 = 0;
        loop {
            match self
                .provider
                .search(region.center, radius_meters, &hints)
                .await
            {
                Ok(records) => {
                    self.cache.insert(key, records.clone()).await;
                    return records;
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(self.backoff_base_ms, self.backoff_cap_ms, attempt);
                    attempt += 1;
                    debug!(
                        region = %region.id,
                        ?category,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Venue listing failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    // 4xx and validation errors land here on the first try
                    warn!(
                        region = %region.id,
                        ?category,
                        error = %e,
                        "Venue listing failed, skipping pair"
                    );
                    return Vec::new();
                }
            }
        }
    }
}
