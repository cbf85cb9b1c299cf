//! Core domain types for the recommendation pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Activity category recognized by intent extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sports,
    Nature,
    Culture,
    Nightlife,
    Food,
    Wellness,
    Adrenaline,
    Creative,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "sports",
            Category::Nature => "nature",
            Category::Culture => "culture",
            Category::Nightlife => "nightlife",
            Category::Food => "food",
            Category::Wellness => "wellness",
            Category::Adrenaline => "adrenaline",
            Category::Creative => "creative",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sports" | "sport" | "fitness" => Ok(Category::Sports),
            "nature" | "outdoors" => Ok(Category::Nature),
            "culture" | "cultural" => Ok(Category::Culture),
            "nightlife" => Ok(Category::Nightlife),
            "food" | "dining" => Ok(Category::Food),
            "wellness" | "relaxation" => Ok(Category::Wellness),
            "adrenaline" | "adventure" => Ok(Category::Adrenaline),
            "creative" | "arts" => Ok(Category::Creative),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested energy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Energy {
    Chill,
    Medium,
    High,
}

/// Indoor/outdoor preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndoorOutdoor {
    Indoor,
    Outdoor,
    Either,
}

/// Which interpretation path produced the intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentMethod {
    Semantic,
    KeywordFallback,
}

/// Geographic point (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Structured interpretation of a free-text vibe
///
/// Produced per request; immutable once created; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub categories: Vec<Category>,
    pub energy: Energy,
    pub indoor_outdoor: IndoorOutdoor,
    pub radius_meters: u32,
    /// Interpretation confidence, clamped to [0, 1]
    pub confidence: f32,
    pub method: IntentMethod,
}

/// Candidate region derived from the static region table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRegion {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub distance_km: f64,
    pub travel_time_min: f64,
}

/// Thematic bucket used to enforce result diversity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Adrenaline,
    Culture,
    Nature,
    Nightlife,
    Sports,
    Wellness,
    Creative,
    Food,
    Unclassified,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Adrenaline => "adrenaline",
            Sector::Culture => "culture",
            Sector::Nature => "nature",
            Sector::Nightlife => "nightlife",
            Sector::Sports => "sports",
            Sector::Wellness => "wellness",
            Sector::Creative => "creative",
            Sector::Food => "food",
            Sector::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw venue record from the places provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRecord {
    pub id: String,
    pub name: String,
    pub coords: GeoPoint,
    #[serde(default)]
    pub tags: Vec<String>,
    pub rating: Option<f32>,
    pub rating_count: Option<u32>,
}

/// Venue verified against the places provider
///
/// Deduplicated by `place_id`; never mutated after creation
/// (replace-on-refresh only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedVenue {
    /// Provider-scoped unique key
    pub place_id: String,
    pub name: String,
    pub coords: GeoPoint,
    pub rating: Option<f32>,
    pub rating_count: Option<u32>,
    pub sector: Sector,
    /// Distance from the request origin
    pub distance_km: f64,
    pub source_provider: String,
}

/// Venue with pipeline-computed relevance score
#[derive(Debug, Clone)]
pub struct ScoredVenue {
    pub venue: VerifiedVenue,
    /// Relevance before the feedback multiplier
    pub base_score: f32,
    /// Feedback multiplier applied (1.0 = neutral)
    pub multiplier: f32,
    /// `base_score * multiplier`
    pub score: f32,
}

/// Raw approve/reject aggregate for one activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRow {
    pub activity_id: Uuid,
    pub approvals: u32,
    pub rejections: u32,
}

/// Feedback-derived scoring decision for one activity
///
/// `should_avoid` and `should_boost` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackScore {
    pub activity_id: Uuid,
    pub total_ratings: u32,
    pub approval_rate: f32,
    pub should_avoid: bool,
    pub should_boost: bool,
    pub multiplier: f32,
}

/// Locally-known activity record from the activity catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    /// Provider place id this activity is linked to, when verified
    pub place_id: Option<String>,
    pub name: String,
    pub category: Option<Category>,
}

/// Filter predicate for activity catalog queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    /// Empty = no category restriction
    pub categories: Vec<Category>,
}

/// One curated venue with its optional blurb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedVenue {
    pub venue: VerifiedVenue,
    pub blurb: Option<String>,
}

/// Final output unit; read-only after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub label: String,
    pub venues: Vec<RecommendedVenue>,
    pub rationale: String,
    pub confidence: f32,
}

/// Why a response contains what it contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    Ok,
    /// No venues survived the full pipeline — explicit "no matches" outcome
    NoMatches,
}

/// Request constraints beyond the vibe text and origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    /// Total available time, minutes
    pub duration_minutes: f64,
    /// Optional explicit search radius override
    pub radius_meters: Option<u32>,
}

/// A recommendation request entering the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub vibe_text: String,
    pub origin: GeoPoint,
    pub constraints: Constraints,
}

/// Pipeline execution metadata returned with every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendMeta {
    /// Verified venues considered before diversification
    pub candidates_considered: usize,
    pub providers_used: Vec<String>,
    pub elapsed_ms: u64,
    pub reason: ReasonCode,
}

/// Pipeline output — always returned, never an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub meta: RecommendMeta,
}
