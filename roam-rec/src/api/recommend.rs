//! Recommendation endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::types::{Constraints, GeoPoint, RecommendRequest, RecommendResponse};
use crate::AppState;

/// POST /recommend request body
#[derive(Debug, Deserialize)]
pub struct RecommendApiRequest {
    pub vibe_text: String,
    pub lat: f64,
    pub lng: f64,
    pub duration_minutes: f64,
    #[serde(default)]
    pub radius_meters: Option<u32>,
}

/// POST /recommend
///
/// Validation rejects out-of-range coordinates and non-positive
/// durations; an empty vibe text is valid (the pipeline falls back to a
/// generic intent).
pub async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendApiRequest>,
) -> ApiResult<Json<RecommendResponse>> {
    if !(-90.0..=90.0).contains(&body.lat) || !(-180.0..=180.0).contains(&body.lng) {
        return Err(ApiError::BadRequest(format!(
            "coordinates out of range: ({}, {})",
            body.lat, body.lng
        )));
    }
    if !body.duration_minutes.is_finite() || body.duration_minutes <= 0.0 {
        return Err(ApiError::BadRequest(
            "duration_minutes must be positive".to_string(),
        ));
    }

    let response = state
        .recommender
        .recommend(RecommendRequest {
            vibe_text: body.vibe_text,
            origin: GeoPoint {
                lat: body.lat,
                lng: body.lng,
            },
            constraints: Constraints {
                duration_minutes: body.duration_minutes,
                radius_meters: body.radius_meters,
            },
        })
        .await;

    Ok(Json(response))
}

/// Build recommendation routes
pub fn recommend_routes() -> Router<AppState> {
    Router::new().route("/recommend", post(recommend))
}
