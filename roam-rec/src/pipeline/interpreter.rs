//! Vibe interpretation
//!
//! **[REC-INT-100]** Maps free text to a structured `Intent`. Primary path
//! is one queued model call returning strict JSON; the keyword lexicon is
//! the always-successful fallback when the model is unavailable, times
//! out, or is not confident enough.

use super::lexicon;
use crate::providers::{ModelRequest, ProviderError};
use crate::queue::RequestQueue;
use crate::types::{Category, Energy, IndoorOutdoor, Intent, IntentMethod};
use roam_common::Tunables;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Queue priority for intent extraction (most urgent — it gates the pipeline)
pub const PRIORITY_INTENT: u8 = 0;

const INTENT_SYSTEM_PROMPT: &str = "\
You extract a structured activity intent from a free-text \"vibe\" description.\n\
Respond with a single JSON object and nothing else:\n\
{\n\
  \"categories\": [..],  // subset of: sports, nature, culture, nightlife, food, wellness, adrenaline, creative\n\
  \"energy\": \"chill\" | \"medium\" | \"high\",\n\
  \"indoor_outdoor\": \"indoor\" | \"outdoor\" | \"either\",\n\
  \"confidence\": 0.0-1.0,\n\
  \"rationale\": \"one short sentence\"\n\
}\n\
Use only the listed category names. The text may be in English or Romanian.";

const INTENT_RETRY_SUFFIX: &str = "\n\
IMPORTANT: your previous answer was not valid. Output ONLY the JSON object, \
with every category taken verbatim from the allowed list, no markdown fences, \
no extra keys, no commentary.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIntent {
    categories: Vec<String>,
    energy: String,
    indoor_outdoor: String,
    confidence: f32,
    #[allow(dead_code)]
    rationale: Option<String>,
}

/// Free text → `Intent`
pub struct VibeInterpreter {
    queue: Option<Arc<RequestQueue>>,
    confidence_floor: f32,
    default_radius_meters: u32,
}

impl VibeInterpreter {
    pub fn new(queue: Option<Arc<RequestQueue>>, tunables: &Tunables) -> Self {
        Self {
            queue,
            confidence_floor: tunables.intent_confidence_floor,
            default_radius_meters: tunables.default_radius_meters,
        }
    }

    /// Interpret a vibe description; never fails
    ///
    /// Empty text skips the model entirely. A low-confidence semantic
    /// result is replaced by the keyword fallback so downstream weighting
    /// can trust `method`.
    pub async fn interpret(&self, text: &str, radius_override: Option<u32>) -> Intent {
        let radius_meters = radius_override.unwrap_or(self.default_radius_meters);

        if text.trim().is_empty() {
            debug!("Empty vibe text, using keyword fallback");
            return self.keyword_fallback(text, radius_meters);
        }

        if let Some(queue) = &self.queue {
            match self.semantic(queue, text, radius_meters).await {
                Ok(intent) if intent.confidence >= self.confidence_floor => {
                    debug!(
                        confidence = intent.confidence,
                        categories = ?intent.categories,
                        "Semantic intent accepted"
                    );
                    return intent;
                }
                Ok(intent) => {
                    debug!(
                        confidence = intent.confidence,
                        floor = self.confidence_floor,
                        "Semantic intent below confidence floor, using keyword fallback"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Semantic intent extraction failed, using keyword fallback");
                }
            }
        }

        self.keyword_fallback(text, radius_meters)
    }

    async fn semantic(
        &self,
        queue: &RequestQueue,
        text: &str,
        radius_meters: u32,
    ) -> Result<Intent, ProviderError> {
        let response = queue
            .submit(
                PRIORITY_INTENT,
                ModelRequest {
                    system: INTENT_SYSTEM_PROMPT.to_string(),
                    user: text.to_string(),
                    max_tokens: 0,
                    purpose: "intent",
                },
            )
            .await?;

        match parse_intent(&response.content, radius_meters) {
            Ok(intent) => Ok(intent),
            Err(first_err) => {
                // One retry with strengthened instructions; identical input
                // against the same flawed prompt rarely helps otherwise
                debug!(error = %first_err, "Intent validation failed, retrying with strengthened instructions");
                let retry = queue
                    .submit(
                        PRIORITY_INTENT,
                        ModelRequest {
                            system: format!("{}{}", INTENT_SYSTEM_PROMPT, INTENT_RETRY_SUFFIX),
                            user: text.to_string(),
                            max_tokens: 0,
                            purpose: "intent-retry",
                        },
                    )
                    .await?;
                parse_intent(&retry.content, radius_meters)
            }
        }
    }

    fn keyword_fallback(&self, text: &str, radius_meters: u32) -> Intent {
        let categories = lexicon::match_categories(text);
        let energy = lexicon::match_energy(text).unwrap_or(Energy::Medium);
        let indoor_outdoor = lexicon::match_indoor_outdoor(text).unwrap_or(IndoorOutdoor::Either);
        let confidence = if categories.is_empty() { 0.15 } else { 0.4 };

        Intent {
            categories,
            energy,
            indoor_outdoor,
            radius_meters,
            confidence,
            method: IntentMethod::KeywordFallback,
        }
    }
}

/// Validate raw model output into an `Intent`
///
/// Unknown categories are rejected outright rather than skipped; the
/// caller retries once with strengthened instructions.
fn parse_intent(content: &str, radius_meters: u32) -> Result<Intent, ProviderError> {
    let raw: RawIntent = serde_json::from_str(content)
        .map_err(|e| ProviderError::Validation(format!("intent JSON: {}", e)))?;

    let mut categories = Vec::with_capacity(raw.categories.len());
    for name in &raw.categories {
        let category = Category::from_str(name)
            .map_err(|_| ProviderError::Validation(format!("unknown category: {}", name)))?;
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    let energy = match raw.energy.trim().to_lowercase().as_str() {
        "chill" => Energy::Chill,
        "medium" => Energy::Medium,
        "high" => Energy::High,
        other => {
            return Err(ProviderError::Validation(format!(
                "unknown energy: {}",
                other
            )))
        }
    };

    let indoor_outdoor = match raw.indoor_outdoor.trim().to_lowercase().as_str() {
        "indoor" => IndoorOutdoor::Indoor,
        "outdoor" => IndoorOutdoor::Outdoor,
        "either" => IndoorOutdoor::Either,
        other => {
            return Err(ProviderError::Validation(format!(
                "unknown indoor_outdoor: {}",
                other
            )))
        }
    };

    Ok(Intent {
        categories,
        energy,
        indoor_outdoor,
        radius_meters,
        confidence: raw.confidence.clamp(0.0, 1.0),
        method: IntentMethod::Semantic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_intent() {
        let json = r#"{
            "categories": ["nature", "wellness"],
            "energy": "chill",
            "indoor_outdoor": "outdoor",
            "confidence": 0.85,
            "rationale": "calm outdoor day"
        }"#;
        let intent = parse_intent(json, 5000).unwrap();
        assert_eq!(intent.categories, vec![Category::Nature, Category::Wellness]);
        assert_eq!(intent.energy, Energy::Chill);
        assert_eq!(intent.method, IntentMethod::Semantic);
        assert_eq!(intent.radius_meters, 5000);
    }

    #[test]
    fn test_parse_rejects_unknown_category() {
        let json = r#"{"categories":["shopping"],"energy":"medium","indoor_outdoor":"either","confidence":0.9,"rationale":""}"#;
        let err = parse_intent(json, 5000).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_parse_rejects_extra_keys() {
        let json = r#"{"categories":[],"energy":"medium","indoor_outdoor":"either","confidence":0.9,"rationale":"","mood":"happy"}"#;
        assert!(parse_intent(json, 5000).is_err());
    }

    #[test]
    fn test_confidence_clamped() {
        let json = r#"{"categories":["food"],"energy":"high","indoor_outdoor":"either","confidence":3.2,"rationale":""}"#;
        let intent = parse_intent(json, 5000).unwrap();
        assert_eq!(intent.confidence, 1.0);
    }

    #[test]
    fn test_duplicate_categories_deduplicated() {
        let json = r#"{"categories":["food","dining"],"energy":"medium","indoor_outdoor":"either","confidence":0.7,"rationale":""}"#;
        let intent = parse_intent(json, 5000).unwrap();
        assert_eq!(intent.categories, vec![Category::Food]);
    }

    #[tokio::test]
    async fn test_empty_text_uses_fallback_without_model() {
        // No queue configured at all — must still succeed
        let interpreter = VibeInterpreter::new(None, &Tunables::default());
        let intent = interpreter.interpret("   ", None).await;
        assert_eq!(intent.method, IntentMethod::KeywordFallback);
        assert!(intent.categories.is_empty());
        assert_eq!(intent.indoor_outdoor, IndoorOutdoor::Either);
    }

    #[tokio::test]
    async fn test_sports_resolves_under_forced_fallback() {
        let interpreter = VibeInterpreter::new(None, &Tunables::default());
        let intent = interpreter.interpret("I want sports", None).await;
        assert_eq!(intent.method, IntentMethod::KeywordFallback);
        assert_eq!(intent.categories, vec![Category::Sports]);
    }

    #[tokio::test]
    async fn test_radius_override_respected() {
        let interpreter = VibeInterpreter::new(None, &Tunables::default());
        let intent = interpreter.interpret("chill park day", Some(12_000)).await;
        assert_eq!(intent.radius_meters, 12_000);
        assert_eq!(intent.energy, Energy::Chill);
    }
}
