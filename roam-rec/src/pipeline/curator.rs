//! Final curation
//!
//! **[REC-CUR-010]** Asks the model to rerank, cluster, and summarize the
//! diversified candidate set, then validates that every identifier the
//! model emitted is a member of the input set. A foreign ID invalidates
//! that field only; a fully invalid response (or no model at all) falls
//! back to the deterministic rating sort — the liveness guarantee against
//! total model failure.

use crate::providers::{ModelRequest, ProviderError};
use crate::queue::RequestQueue;
use crate::types::{Intent, Recommendation, RecommendedVenue, ScoredVenue};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

/// Queue priority for curation (runs after intent extraction)
pub const PRIORITY_CURATION: u8 = 2;

const CURATION_SYSTEM_PROMPT: &str = "\
You curate a list of verified venues for a user's free-text vibe.\n\
Respond with a single JSON object and nothing else:\n\
{\n\
  \"ranked_ids\": [..],          // every input id, best match first\n\
  \"clusters\": [{\"label\": \"..\", \"ids\": [..]}],  // optional thematic groups\n\
  \"summaries\": {\"<id>\": \"one short blurb\"}       // optional, per id\n\
}\n\
Use ONLY ids from the candidate list. Never invent ids.";

const CURATION_RETRY_SUFFIX: &str = "\n\
IMPORTANT: your previous answer was not valid. Output ONLY the JSON object. \
Every id in ranked_ids, clusters, and summaries MUST be copied verbatim from \
the candidate list. No markdown fences, no extra keys.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCuration {
    ranked_ids: Vec<String>,
    #[serde(default)]
    clusters: Vec<RawCluster>,
    #[serde(default)]
    summaries: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCluster {
    label: String,
    ids: Vec<String>,
}

/// Curation result plus how it was produced
pub struct CurationOutcome {
    pub recommendations: Vec<Recommendation>,
    pub used_fallback: bool,
}

/// LLM-assisted reranking with a deterministic fallback
pub struct Curator {
    queue: Option<Arc<RequestQueue>>,
}

impl Curator {
    pub fn new(queue: Option<Arc<RequestQueue>>) -> Self {
        Self { queue }
    }

    /// Produce the final ordering, clusters, and blurbs
    pub async fn curate(
        &self,
        vibe_text: &str,
        intent: &Intent,
        candidates: &[ScoredVenue],
    ) -> CurationOutcome {
        if candidates.is_empty() {
            return CurationOutcome {
                recommendations: Vec::new(),
                used_fallback: false,
            };
        }

        if let Some(queue) = &self.queue {
            match self.model_curation(queue, vibe_text, intent, candidates).await {
                Ok(recommendations) => {
                    return CurationOutcome {
                        recommendations,
                        used_fallback: false,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Model curation failed, using deterministic fallback");
                }
            }
        }

        CurationOutcome {
            recommendations: vec![fallback_recommendation(candidates, intent)],
            used_fallback: true,
        }
    }

    async fn model_curation(
        &self,
        queue: &RequestQueue,
        vibe_text: &str,
        intent: &Intent,
        candidates: &[ScoredVenue],
    ) -> Result<Vec<Recommendation>, ProviderError> {
        let user = build_user_prompt(vibe_text, candidates);

        let response = queue
            .submit(
                PRIORITY_CURATION,
                ModelRequest {
                    system: CURATION_SYSTEM_PROMPT.to_string(),
                    user: user.clone(),
                    max_tokens: 0,
                    purpose: "curation",
                },
            )
            .await?;

        match parse_and_apply(&response.content, candidates, intent) {
            Ok(recommendations) => Ok(recommendations),
            Err(first_err) => {
                debug!(error = %first_err, "Curation validation failed, retrying with strengthened instructions");
                let retry = queue
                    .submit(
                        PRIORITY_CURATION,
                        ModelRequest {
                            system: format!("{}{}", CURATION_SYSTEM_PROMPT, CURATION_RETRY_SUFFIX),
                            user,
                            max_tokens: 0,
                            purpose: "curation-retry",
                        },
                    )
                    .await?;
                parse_and_apply(&retry.content, candidates, intent)
            }
        }
    }
}

fn build_user_prompt(vibe_text: &str, candidates: &[ScoredVenue]) -> String {
    let mut prompt = format!("Vibe: {}\n\nCandidates:\n", vibe_text);
    for candidate in candidates {
        let v = &candidate.venue;
        let _ = writeln!(
            prompt,
            "{{\"id\":\"{}\",\"name\":\"{}\",\"sector\":\"{}\",\"rating\":{},\"rating_count\":{}}}",
            v.place_id,
            v.name.replace('"', "'"),
            v.sector,
            v.rating.map(|r| r.to_string()).unwrap_or_else(|| "null".into()),
            v.rating_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "null".into()),
        );
    }
    prompt
}

fn parse_and_apply(
    content: &str,
    candidates: &[ScoredVenue],
    intent: &Intent,
) -> Result<Vec<Recommendation>, ProviderError> {
    let raw: RawCuration = serde_json::from_str(content)
        .map_err(|e| ProviderError::Validation(format!("curation JSON: {}", e)))?;
    apply_curation(raw, candidates, intent)
}

/// Validate model output field-by-field and assemble recommendations
///
/// Output identifiers are always a subset of the input identifiers:
/// venues are looked up in the candidate map, so a foreign id can never
/// reach the output. A field containing a foreign id is discarded whole
/// (rerank) or entry-by-entry (clusters, summaries).
fn apply_curation(
    raw: RawCuration,
    candidates: &[ScoredVenue],
    intent: &Intent,
) -> Result<Vec<Recommendation>, ProviderError> {
    let known: HashMap<&str, &ScoredVenue> = candidates
        .iter()
        .map(|c| (c.venue.place_id.as_str(), c))
        .collect();

    let rank_valid = !raw.ranked_ids.is_empty()
        && raw
            .ranked_ids
            .iter()
            .all(|id| known.contains_key(id.as_str()));
    if !rank_valid && !raw.ranked_ids.is_empty() {
        debug!("Rerank field references unknown ids, discarding rerank");
    }

    let valid_clusters: Vec<RawCluster> = raw
        .clusters
        .into_iter()
        .filter(|c| !c.ids.is_empty() && c.ids.iter().all(|id| known.contains_key(id.as_str())))
        .collect();

    let summaries: HashMap<String, String> = raw
        .summaries
        .into_iter()
        .filter(|(id, _)| known.contains_key(id.as_str()))
        .collect();

    if !rank_valid && valid_clusters.is_empty() && summaries.is_empty() {
        return Err(ProviderError::Validation(
            "curation output references no known candidates".to_string(),
        ));
    }

    // Final order: validated rerank, or score order; candidates the model
    // skipped are appended so nothing is silently dropped
    let mut order: Vec<&ScoredVenue> = Vec::with_capacity(candidates.len());
    let mut placed: HashSet<&str> = HashSet::new();
    if rank_valid {
        for id in &raw.ranked_ids {
            if placed.insert(id.as_str()) {
                order.push(known[id.as_str()]);
            }
        }
    }
    let mut rest: Vec<&ScoredVenue> = candidates
        .iter()
        .filter(|c| !placed.contains(c.venue.place_id.as_str()))
        .collect();
    rest.sort_by(|a, b| b.score.total_cmp(&a.score));
    order.extend(rest);

    let to_recommended = |c: &ScoredVenue| RecommendedVenue {
        venue: c.venue.clone(),
        blurb: summaries.get(&c.venue.place_id).cloned(),
    };

    let mut recommendations = Vec::new();
    if valid_clusters.is_empty() {
        recommendations.push(Recommendation {
            label: "Top picks".to_string(),
            venues: order.iter().map(|c| to_recommended(c)).collect(),
            rationale: "Matched and ranked for your vibe".to_string(),
            confidence: intent.confidence,
        });
    } else {
        let mut clustered: HashSet<&str> = HashSet::new();
        for cluster in &valid_clusters {
            let venues: Vec<RecommendedVenue> = cluster
                .ids
                .iter()
                .filter(|id| clustered.insert(id.as_str()))
                .map(|id| to_recommended(known[id.as_str()]))
                .collect();
            if !venues.is_empty() {
                recommendations.push(Recommendation {
                    label: cluster.label.clone(),
                    venues,
                    rationale: format!("{} picks for your vibe", cluster.label),
                    confidence: intent.confidence,
                });
            }
        }
        let leftovers: Vec<RecommendedVenue> = order
            .iter()
            .filter(|c| !clustered.contains(c.venue.place_id.as_str()))
            .map(|c| to_recommended(c))
            .collect();
        if !leftovers.is_empty() {
            recommendations.push(Recommendation {
                label: "More to explore".to_string(),
                venues: leftovers,
                rationale: "Also matched your vibe".to_string(),
                confidence: intent.confidence,
            });
        }
    }

    Ok(recommendations)
}

/// Deterministic fallback: rating descending, then rating count descending
///
/// Pure function over already-known data; always succeeds.
pub fn fallback_recommendation(candidates: &[ScoredVenue], intent: &Intent) -> Recommendation {
    let mut sorted: Vec<&ScoredVenue> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        let ra = a.venue.rating.unwrap_or(0.0);
        let rb = b.venue.rating.unwrap_or(0.0);
        rb.total_cmp(&ra).then(
            b.venue
                .rating_count
                .unwrap_or(0)
                .cmp(&a.venue.rating_count.unwrap_or(0)),
        )
    });

    Recommendation {
        label: "Top rated".to_string(),
        venues: sorted
            .into_iter()
            .map(|c| RecommendedVenue {
                venue: c.venue.clone(),
                blurb: None,
            })
            .collect(),
        rationale: "Ranked by visitor rating".to_string(),
        confidence: intent.confidence.min(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Energy, GeoPoint, IndoorOutdoor, IntentMethod, Sector, VerifiedVenue};

    fn candidate(place_id: &str, rating: f32, rating_count: u32, score: f32) -> ScoredVenue {
        ScoredVenue {
            venue: VerifiedVenue {
                place_id: place_id.to_string(),
                name: format!("Venue {}", place_id),
                coords: GeoPoint { lat: 44.4, lng: 26.1 },
                rating: Some(rating),
                rating_count: Some(rating_count),
                sector: Sector::Nature,
                distance_km: 3.0,
                source_provider: "places".to_string(),
            },
            base_score: score,
            multiplier: 1.0,
            score,
        }
    }

    fn intent() -> Intent {
        Intent {
            categories: vec![],
            energy: Energy::Medium,
            indoor_outdoor: IndoorOutdoor::Either,
            radius_meters: 5000,
            confidence: 0.8,
            method: IntentMethod::Semantic,
        }
    }

    fn output_ids(recommendations: &[Recommendation]) -> Vec<String> {
        recommendations
            .iter()
            .flat_map(|r| r.venues.iter().map(|v| v.venue.place_id.clone()))
            .collect()
    }

    #[test]
    fn test_valid_rerank_applied() {
        let candidates = vec![
            candidate("a", 4.0, 10, 0.9),
            candidate("b", 4.5, 20, 0.8),
        ];
        let raw = RawCuration {
            ranked_ids: vec!["b".to_string(), "a".to_string()],
            clusters: vec![],
            summaries: HashMap::new(),
        };
        let recs = apply_curation(raw, &candidates, &intent()).unwrap();
        assert_eq!(output_ids(&recs), vec!["b", "a"]);
    }

    #[test]
    fn test_foreign_id_invalidates_rerank_only() {
        let candidates = vec![
            candidate("a", 4.0, 10, 0.9),
            candidate("b", 4.5, 20, 0.8),
        ];
        let mut summaries = HashMap::new();
        summaries.insert("a".to_string(), "great spot".to_string());
        summaries.insert("ghost".to_string(), "fabricated".to_string());
        let raw = RawCuration {
            ranked_ids: vec!["ghost".to_string(), "a".to_string()],
            clusters: vec![],
            summaries,
        };
        let recs = apply_curation(raw, &candidates, &intent()).unwrap();

        // Rerank discarded → score order; valid summary entry survives
        assert_eq!(output_ids(&recs), vec!["a", "b"]);
        assert_eq!(recs[0].venues[0].blurb.as_deref(), Some("great spot"));
    }

    #[test]
    fn test_fully_foreign_response_is_rejected() {
        let candidates = vec![candidate("a", 4.0, 10, 0.9)];
        let raw = RawCuration {
            ranked_ids: vec!["x".to_string(), "y".to_string()],
            clusters: vec![],
            summaries: HashMap::new(),
        };
        assert!(apply_curation(raw, &candidates, &intent()).is_err());
    }

    #[test]
    fn test_output_ids_always_subset_of_input() {
        let candidates = vec![
            candidate("a", 4.0, 10, 0.9),
            candidate("b", 4.5, 20, 0.8),
            candidate("c", 3.9, 5, 0.7),
        ];
        let input_ids: HashSet<String> =
            candidates.iter().map(|c| c.venue.place_id.clone()).collect();

        // Hostile output mixing known and fabricated ids in every field
        let mut summaries = HashMap::new();
        summaries.insert("c".to_string(), "ok".to_string());
        summaries.insert("fake-1".to_string(), "nope".to_string());
        let raw = RawCuration {
            ranked_ids: vec!["a".to_string(), "fake-2".to_string()],
            clusters: vec![
                RawCluster {
                    label: "Real".to_string(),
                    ids: vec!["b".to_string()],
                },
                RawCluster {
                    label: "Fake".to_string(),
                    ids: vec!["b".to_string(), "fake-3".to_string()],
                },
            ],
            summaries,
        };
        let recs = apply_curation(raw, &candidates, &intent()).unwrap();
        for id in output_ids(&recs) {
            assert!(input_ids.contains(&id), "foreign id leaked: {}", id);
        }
    }

    #[test]
    fn test_clusters_become_recommendations() {
        let candidates = vec![
            candidate("a", 4.0, 10, 0.9),
            candidate("b", 4.5, 20, 0.8),
            candidate("c", 3.9, 5, 0.7),
        ];
        let raw = RawCuration {
            ranked_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            clusters: vec![RawCluster {
                label: "Green escapes".to_string(),
                ids: vec!["a".to_string(), "c".to_string()],
            }],
            summaries: HashMap::new(),
        };
        let recs = apply_curation(raw, &candidates, &intent()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].label, "Green escapes");
        assert_eq!(recs[1].label, "More to explore");
        assert_eq!(output_ids(&recs).len(), 3);
    }

    #[test]
    fn test_skipped_candidates_are_appended() {
        let candidates = vec![
            candidate("a", 4.0, 10, 0.5),
            candidate("b", 4.5, 20, 0.9),
        ];
        let raw = RawCuration {
            ranked_ids: vec!["a".to_string()],
            clusters: vec![],
            summaries: HashMap::new(),
        };
        let recs = apply_curation(raw, &candidates, &intent()).unwrap();
        assert_eq!(output_ids(&recs), vec!["a", "b"]);
    }

    #[test]
    fn test_fallback_sorts_by_rating_then_count() {
        let candidates = vec![
            candidate("low", 3.8, 500, 0.9),
            candidate("high", 4.9, 10, 0.1),
            candidate("high-popular", 4.9, 300, 0.2),
        ];
        let rec = fallback_recommendation(&candidates, &intent());
        let ids: Vec<&str> = rec.venues.iter().map(|v| v.venue.place_id.as_str()).collect();
        assert_eq!(ids, vec!["high-popular", "high", "low"]);
        assert!(rec.venues.iter().all(|v| v.blurb.is_none()));
    }

    #[tokio::test]
    async fn test_curate_without_queue_uses_fallback() {
        let curator = Curator::new(None);
        let candidates = vec![candidate("a", 4.0, 10, 0.9)];
        let outcome = curator.curate("chill day", &intent(), &candidates).await;
        assert!(outcome.used_fallback);
        assert_eq!(outcome.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_curate_empty_candidates() {
        let curator = Curator::new(None);
        let outcome = curator.curate("anything", &intent(), &[]).await;
        assert!(outcome.recommendations.is_empty());
        assert!(!outcome.used_fallback);
    }
}
