//! Vibe recommendation pipeline
//!
//! **[REC-PIPE-010]** Orchestrates the full flow: intent extraction →
//! region fan-out → venue verification → feedback scoring → sector
//! diversification → curation. Always returns a response object; total
//! provider failure degrades to rating-sorted venues, never an error.

pub mod curator;
pub mod diversifier;
pub mod feedback;
pub mod interpreter;
pub mod lexicon;
pub mod regions;
pub mod verifier;

pub use curator::Curator;
pub use diversifier::SectorDiversifier;
pub use feedback::FeedbackScorer;
pub use interpreter::VibeInterpreter;
pub use regions::RegionFanout;
pub use verifier::VenueVerifier;

use crate::providers::PlacesProvider;
use crate::queue::RequestQueue;
use crate::storage::{ActivityStore, FeedbackStore};
use crate::types::{
    ActivityFilter, Intent, IntentMethod, ReasonCode, RecommendMeta, RecommendRequest,
    RecommendResponse, ScoredVenue, VerifiedVenue,
};
use roam_common::events::{EventBus, IntentMethodTag, PipelineEvent};
use roam_common::Tunables;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Pipeline orchestrator
///
/// Holds explicitly constructed, injectable components; multiple
/// independent instances can coexist (isolated tests, per-tenant
/// pipelines).
pub struct Recommender {
    interpreter: VibeInterpreter,
    fanout: RegionFanout,
    verifier: VenueVerifier,
    scorer: FeedbackScorer,
    diversifier: SectorDiversifier,
    curator: Curator,
    feedback_store: Arc<dyn FeedbackStore>,
    activity_store: Arc<dyn ActivityStore>,
    event_bus: Option<EventBus>,
    places_provider_id: &'static str,
    tunables: Tunables,
}

impl Recommender {
    pub fn new(
        queue: Option<Arc<RequestQueue>>,
        places: Arc<dyn PlacesProvider>,
        feedback_store: Arc<dyn FeedbackStore>,
        activity_store: Arc<dyn ActivityStore>,
        tunables: Tunables,
        event_bus: Option<EventBus>,
    ) -> Self {
        let places_provider_id = places.provider_id();
        Self {
            interpreter: VibeInterpreter::new(queue.clone(), &tunables),
            fanout: RegionFanout::new(&tunables),
            verifier: VenueVerifier::new(places, &tunables),
            scorer: FeedbackScorer::new(&tunables),
            diversifier: SectorDiversifier::new(&tunables),
            curator: Curator::new(queue),
            feedback_store,
            activity_store,
            event_bus,
            places_provider_id,
            tunables,
        }
    }

    /// Run the full pipeline for one request
    pub async fn recommend(&self, request: RecommendRequest) -> RecommendResponse {
        let started = std::time::Instant::now();
        let request_id = Uuid::new_v4();

        info!(
            request_id = %request_id,
            vibe = %request.vibe_text,
            duration_minutes = request.constraints.duration_minutes,
            "Recommendation request started"
        );
        self.emit(PipelineEvent::RequestStarted {
            request_id,
            timestamp: chrono::Utc::now(),
        });

        // Phase 1: intent
        let intent = self
            .interpreter
            .interpret(&request.vibe_text, request.constraints.radius_meters)
            .await;
        self.emit(PipelineEvent::IntentResolved {
            request_id,
            method: match intent.method {
                IntentMethod::Semantic => IntentMethodTag::Semantic,
                IntentMethod::KeywordFallback => IntentMethodTag::KeywordFallback,
            },
            confidence: intent.confidence,
            timestamp: chrono::Utc::now(),
        });

        // Phase 2: region fan-out (pure, synchronous)
        let fanout = self
            .fanout
            .candidate_regions(request.origin, request.constraints.duration_minutes);
        self.emit(PipelineEvent::RegionsSelected {
            request_id,
            region_count: fanout.regions.len(),
            willing_to_travel: fanout.willing_to_travel,
            timestamp: chrono::Utc::now(),
        });

        // Phase 3: venue verification (parallel per region, bounded)
        let venues = self
            .verifier
            .verify(
                request.origin,
                &fanout.regions,
                &intent.categories,
                intent.radius_meters,
            )
            .await;
        self.emit(PipelineEvent::VenuesVerified {
            request_id,
            venue_count: venues.len(),
            timestamp: chrono::Utc::now(),
        });

        let mut providers_used = vec![self.places_provider_id.to_string()];
        if intent.method == IntentMethod::Semantic {
            providers_used.push("model".to_string());
        }

        if venues.is_empty() {
            info!(request_id = %request_id, "No venues found after full pipeline");
            self.emit(PipelineEvent::RequestCompleted {
                request_id,
                recommendation_count: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
                timestamp: chrono::Utc::now(),
            });
            return RecommendResponse {
                recommendations: Vec::new(),
                meta: RecommendMeta {
                    candidates_considered: 0,
                    providers_used,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    reason: ReasonCode::NoMatches,
                },
            };
        }

        let candidates_considered = venues.len();

        // Phase 4: feedback-weighted scoring
        let multipliers = self.feedback_multipliers(&intent, &venues).await;
        let scored: Vec<ScoredVenue> = venues
            .into_iter()
            .map(|venue| {
                let base_score = self.base_score(&venue, &intent);
                let multiplier = multipliers.get(&venue.place_id).copied().unwrap_or(1.0);
                ScoredVenue {
                    score: base_score * multiplier,
                    base_score,
                    multiplier,
                    venue,
                }
            })
            .collect();

        // Phase 5: sector diversification (pure, synchronous)
        let shortlist = self.diversifier.select(scored);

        // Phase 6: curation
        let outcome = self
            .curator
            .curate(&request.vibe_text, &intent, &shortlist)
            .await;
        if !outcome.used_fallback && !providers_used.iter().any(|p| p == "model") {
            providers_used.push("model".to_string());
        }
        self.emit(PipelineEvent::CurationCompleted {
            request_id,
            used_fallback: outcome.used_fallback,
            timestamp: chrono::Utc::now(),
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            recommendations = outcome.recommendations.len(),
            candidates_considered,
            elapsed_ms,
            "Recommendation request complete"
        );
        self.emit(PipelineEvent::RequestCompleted {
            request_id,
            recommendation_count: outcome.recommendations.len(),
            elapsed_ms,
            timestamp: chrono::Utc::now(),
        });

        RecommendResponse {
            recommendations: outcome.recommendations,
            meta: RecommendMeta {
                candidates_considered,
                providers_used,
                elapsed_ms,
                reason: ReasonCode::Ok,
            },
        }
    }

    /// Feedback multipliers keyed by place id
    ///
    /// Venues acquire an activity id by matching `place_id` against the
    /// activity catalog; unmatched venues stay neutral.
    async fn feedback_multipliers(
        &self,
        intent: &Intent,
        venues: &[VerifiedVenue],
    ) -> HashMap<String, f32> {
        let filter = ActivityFilter {
            categories: intent.categories.clone(),
        };
        let activities = match self.activity_store.activity_candidates(&filter).await {
            Ok(activities) => activities,
            Err(e) => {
                warn!(error = %e, "Activity catalog query failed, scoring neutral");
                return HashMap::new();
            }
        };

        let activity_by_place: HashMap<&str, Uuid> = activities
            .iter()
            .filter_map(|a| a.place_id.as_deref().map(|p| (p, a.id)))
            .collect();

        let activity_ids: Vec<Uuid> = venues
            .iter()
            .filter_map(|v| activity_by_place.get(v.place_id.as_str()).copied())
            .collect();

        let scores = self
            .scorer
            .multipliers(self.feedback_store.as_ref(), &activity_ids)
            .await;

        venues
            .iter()
            .filter_map(|v| {
                let activity_id = activity_by_place.get(v.place_id.as_str())?;
                let score = scores.get(activity_id)?;
                Some((v.place_id.clone(), score.multiplier))
            })
            .collect()
    }

    /// Base relevance score before the feedback multiplier
    ///
    /// Weighted blend of normalized rating, popularity, and proximity
    /// within the intent radius; every component is non-negative so the
    /// multiplier can never flip a score's sign.
    fn base_score(&self, venue: &VerifiedVenue, intent: &Intent) -> f32 {
        let t = &self.tunables;

        let rating_norm = (venue.rating.unwrap_or(3.0) / 5.0).clamp(0.0, 1.0);
        let popularity = ((1.0 + venue.rating_count.unwrap_or(0) as f32).ln()
            / (1.0f32 + 1000.0).ln())
        .clamp(0.0, 1.0);
        let radius_km = (intent.radius_meters as f32 / 1000.0).max(0.1);
        let proximity = (1.0 - venue.distance_km as f32 / radius_km).clamp(0.0, 1.0);

        t.score_rating_weight * rating_norm
            + t.score_popularity_weight * popularity
            + t.score_proximity_weight * proximity
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}
