//! Feedback scoring
//!
//! **[REC-FBK-010]** Turns historical approve/reject aggregates into a
//! scalar multiplier applied to each venue's base relevance score before
//! diversification. Sparse data (<3 ratings) stays neutral — no bias
//! either way.

use crate::storage::FeedbackStore;
use crate::types::{FeedbackRow, FeedbackScore};
use roam_common::Tunables;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Feedback aggregates → multiplier
pub struct FeedbackScorer {
    min_ratings: u32,
    boost_approval_rate: f32,
    boost_multiplier: f32,
    avoid_rejection_rate: f32,
    avoid_multiplier: f32,
    mid_multiplier_cap: f32,
}

impl FeedbackScorer {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            min_ratings: tunables.feedback_min_ratings,
            boost_approval_rate: tunables.boost_approval_rate,
            boost_multiplier: tunables.boost_multiplier,
            avoid_rejection_rate: tunables.avoid_rejection_rate,
            avoid_multiplier: tunables.avoid_multiplier,
            mid_multiplier_cap: tunables.mid_multiplier_cap,
        }
    }

    /// Score one activity's aggregate
    ///
    /// Between the boost/avoid extremes the multiplier is linear in the
    /// approval rate: below 50% it scales from 0.5 upward, above 50% from
    /// 1.0 upward, capped for "good but not top tier". `should_avoid` and
    /// `should_boost` are mutually exclusive by construction.
    pub fn score(&self, row: &FeedbackRow) -> FeedbackScore {
        let total_ratings = row.approvals + row.rejections;

        if total_ratings < self.min_ratings {
            return FeedbackScore {
                activity_id: row.activity_id,
                total_ratings,
                approval_rate: 0.0,
                should_avoid: false,
                should_boost: false,
                multiplier: 1.0,
            };
        }

        let approval_rate = row.approvals as f32 / total_ratings as f32;
        let rejection_rate = row.rejections as f32 / total_ratings as f32;

        let (multiplier, should_boost, should_avoid) = if approval_rate >= self.boost_approval_rate
        {
            (self.boost_multiplier, true, false)
        } else if rejection_rate >= self.avoid_rejection_rate {
            (self.avoid_multiplier, false, true)
        } else if approval_rate < 0.5 {
            (0.5 + approval_rate, false, false)
        } else {
            (
                (1.0 + 2.0 * (approval_rate - 0.5)).min(self.mid_multiplier_cap),
                false,
                false,
            )
        };

        FeedbackScore {
            activity_id: row.activity_id,
            total_ratings,
            approval_rate,
            should_avoid,
            should_boost,
            multiplier,
        }
    }

    /// Fetch aggregates and score every requested activity
    ///
    /// Store failures degrade to an empty map (all venues neutral) rather
    /// than failing the request.
    pub async fn multipliers(
        &self,
        store: &dyn FeedbackStore,
        activity_ids: &[Uuid],
    ) -> HashMap<Uuid, FeedbackScore> {
        if activity_ids.is_empty() {
            return HashMap::new();
        }

        let rows = match store.feedback_aggregates(activity_ids).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Feedback aggregate query failed, scoring neutral");
                return HashMap::new();
            }
        };

        rows.iter()
            .map(|row| (row.activity_id, self.score(row)))
            .collect()
    }
}
