//! Tunable pipeline parameters
//!
//! **[REC-PARAM-010]** Every empirically-tuned constant in the recommendation
//! pipeline (feedback multipliers, sector caps, travel speed tiers, retry
//! backoff) lives here rather than hard-coded at the use site.
//!
//! # Architecture
//!
//! A `Tunables` value is deserialized from the `[tunables]` section of the
//! TOML config (every field has a serde default) and passed by value into
//! the components that need it. Components never reach for a global; tests
//! construct a `Tunables` and override the fields under test.

use serde::{Deserialize, Serialize};

/// Tunable pipeline parameters
///
/// Defaults reproduce production behavior; any subset can be overridden
/// from the TOML config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    // ------------------------------------------------------------------
    // Intent interpretation
    // ------------------------------------------------------------------
    /// **[REC-PARAM-020]** Minimum model confidence to accept a semantic intent
    ///
    /// Valid range: [0.0, 1.0]
    /// Default: 0.45
    /// Below this the keyword-fallback interpretation is used instead.
    pub intent_confidence_floor: f32,

    /// Default search radius when the request does not constrain it (meters)
    ///
    /// Default: 5000
    pub default_radius_meters: u32,

    // ------------------------------------------------------------------
    // Model request queue
    // ------------------------------------------------------------------
    /// Maximum concurrently in-flight model calls
    ///
    /// Valid range: [1, 8]
    /// Default: 2
    pub queue_max_in_flight: usize,

    /// Attempt budget per queued model task (first try + retries)
    ///
    /// Default: 3
    pub queue_max_attempts: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    ///
    /// Default: 500
    pub queue_backoff_base_ms: u64,

    /// Ceiling for retry/cooldown backoff (milliseconds)
    ///
    /// Default: 30000
    pub queue_backoff_cap_ms: u64,

    /// Per-task timeout for a single model call (seconds)
    ///
    /// Default: 20
    pub model_task_timeout_secs: u64,

    // ------------------------------------------------------------------
    // Region fan-out
    // ------------------------------------------------------------------
    /// **[REC-PARAM-030]** Base search radius around the origin (km)
    ///
    /// Default: 30.0 (local-only)
    pub base_region_radius_km: f64,

    /// Expanded radius once the request crosses the long-trip threshold (km)
    ///
    /// Default: 300.0
    pub extended_region_radius_km: f64,

    /// Requested duration at which the radius auto-expands (minutes)
    ///
    /// Default: 480.0 (8 hours)
    pub long_trip_threshold_min: f64,

    /// Minimum on-site time budgeted out of the requested duration (minutes)
    ///
    /// Default: 120.0
    pub dwell_minutes: f64,

    /// Average speed for city-tier distances, <= `city_tier_km` (km/h)
    ///
    /// Default: 25.0
    pub city_speed_kmh: f64,

    /// Average speed for suburban-tier distances (km/h)
    ///
    /// Default: 45.0
    pub suburban_speed_kmh: f64,

    /// Average speed beyond the suburban tier (km/h)
    ///
    /// Default: 80.0
    pub highway_speed_kmh: f64,

    /// Upper bound of the city speed tier (km)
    ///
    /// Default: 10.0
    pub city_tier_km: f64,

    /// Upper bound of the suburban speed tier (km)
    ///
    /// Default: 50.0
    pub suburban_tier_km: f64,

    // ------------------------------------------------------------------
    // Venue verification
    // ------------------------------------------------------------------
    /// Maximum concurrently in-flight venue-provider calls
    ///
    /// Default: 4
    pub verify_max_concurrency: usize,

    /// Retry budget per venue-provider call (retries after the first attempt)
    ///
    /// Default: 2
    pub verify_max_retries: u32,

    /// Base delay for venue-provider retry backoff (milliseconds)
    ///
    /// Default: 250
    pub verify_backoff_base_ms: u64,

    /// TTL for cached category listings (seconds)
    ///
    /// Default: 3600 (listings move slowly; detail lookups would use less)
    pub listing_cache_ttl_secs: u64,

    // ------------------------------------------------------------------
    // Feedback scoring
    // ------------------------------------------------------------------
    /// **[REC-PARAM-040]** Minimum ratings before feedback biases a score
    ///
    /// Default: 3
    pub feedback_min_ratings: u32,

    /// Approval rate at or above which an activity is boosted
    ///
    /// Valid range: [0.5, 1.0]
    /// Default: 0.70
    pub boost_approval_rate: f32,

    /// Multiplier applied to boosted activities
    ///
    /// Default: 1.8
    pub boost_multiplier: f32,

    /// Rejection rate at or above which an activity is avoided
    ///
    /// Default: 0.80
    pub avoid_rejection_rate: f32,

    /// Multiplier applied to avoided activities
    ///
    /// Default: 0.3
    pub avoid_multiplier: f32,

    /// Cap for the linear mid-band multiplier ("good but not top tier")
    ///
    /// Default: 1.5
    pub mid_multiplier_cap: f32,

    // ------------------------------------------------------------------
    // Sector diversification
    // ------------------------------------------------------------------
    /// Hard cap on the final result count
    ///
    /// Default: 10
    pub max_results: usize,

    /// Maximum venues taken from any single sector
    ///
    /// Default: 3
    pub max_per_sector: usize,

    /// Per-sector priority overrides, keyed by sector name
    ///
    /// Default: empty (the built-in sector table priorities apply)
    pub sector_priority_overrides: std::collections::HashMap<String, u32>,

    // ------------------------------------------------------------------
    // Base relevance score weights
    // ------------------------------------------------------------------
    /// Weight of the normalized provider rating
    ///
    /// Default: 0.6
    pub score_rating_weight: f32,

    /// Weight of rating-count popularity
    ///
    /// Default: 0.2
    pub score_popularity_weight: f32,

    /// Weight of proximity within the intent radius
    ///
    /// Default: 0.2
    pub score_proximity_weight: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            intent_confidence_floor: 0.45,
            default_radius_meters: 5000,
            queue_max_in_flight: 2,
            queue_max_attempts: 3,
            queue_backoff_base_ms: 500,
            queue_backoff_cap_ms: 30_000,
            model_task_timeout_secs: 20,
            base_region_radius_km: 30.0,
            extended_region_radius_km: 300.0,
            long_trip_threshold_min: 480.0,
            dwell_minutes: 120.0,
            city_speed_kmh: 25.0,
            suburban_speed_kmh: 45.0,
            highway_speed_kmh: 80.0,
            city_tier_km: 10.0,
            suburban_tier_km: 50.0,
            verify_max_concurrency: 4,
            verify_max_retries: 2,
            verify_backoff_base_ms: 250,
            listing_cache_ttl_secs: 3600,
            feedback_min_ratings: 3,
            boost_approval_rate: 0.70,
            boost_multiplier: 1.8,
            avoid_rejection_rate: 0.80,
            avoid_multiplier: 0.3,
            mid_multiplier_cap: 1.5,
            max_results: 10,
            max_per_sector: 3,
            sector_priority_overrides: std::collections::HashMap::new(),
            score_rating_weight: 0.6,
            score_popularity_weight: 0.2,
            score_proximity_weight: 0.2,
        }
    }
}
