//! Storage capability traits
//!
//! Persistent storage is owned by an external collaborator; this core
//! consumes it through these traits only. `MemoryStore` backs tests and
//! API-key-less local runs.

use crate::types::{ActivityFilter, ActivityRecord, FeedbackRow};
use async_trait::async_trait;
use roam_common::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read access to approve/reject feedback aggregates
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Aggregates for the given activities; absent ids are simply omitted
    async fn feedback_aggregates(&self, activity_ids: &[Uuid]) -> Result<Vec<FeedbackRow>>;
}

/// Read access to the locally-known activity catalog
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn activity_candidates(&self, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>>;
}

/// In-memory store implementation
#[derive(Default)]
pub struct MemoryStore {
    activities: RwLock<Vec<ActivityRecord>>,
    /// activity id → (approvals, rejections)
    feedback: RwLock<HashMap<Uuid, (u32, u32)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_activity(&self, activity: ActivityRecord) {
        self.activities.write().await.push(activity);
    }

    pub async fn record_feedback(&self, activity_id: Uuid, approved: bool) {
        let mut feedback = self.feedback.write().await;
        let entry = feedback.entry(activity_id).or_insert((0, 0));
        if approved {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn feedback_aggregates(&self, activity_ids: &[Uuid]) -> Result<Vec<FeedbackRow>> {
        let feedback = self.feedback.read().await;
        Ok(activity_ids
            .iter()
            .filter_map(|id| {
                feedback.get(id).map(|(approvals, rejections)| FeedbackRow {
                    activity_id: *id,
                    approvals: *approvals,
                    rejections: *rejections,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn activity_candidates(&self, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>> {
        let activities = self.activities.read().await;
        Ok(activities
            .iter()
            .filter(|a| {
                filter.categories.is_empty()
                    || a.category
                        .map(|c| filter.categories.contains(&c))
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn activity(category: Option<Category>) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            place_id: Some("pl-1".to_string()),
            name: "Test".to_string(),
            category,
        }
    }

    #[tokio::test]
    async fn test_feedback_aggregates_only_known_ids() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.record_feedback(id, true).await;
        store.record_feedback(id, true).await;
        store.record_feedback(id, false).await;

        let rows = store
            .feedback_aggregates(&[id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].approvals, 2);
        assert_eq!(rows[0].rejections, 1);
    }

    #[tokio::test]
    async fn test_candidates_filtered_by_category() {
        let store = MemoryStore::new();
        store.add_activity(activity(Some(Category::Nature))).await;
        store.add_activity(activity(Some(Category::Food))).await;
        store.add_activity(activity(None)).await;

        let all = store
            .activity_candidates(&ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let nature = store
            .activity_candidates(&ActivityFilter {
                categories: vec![Category::Nature],
            })
            .await
            .unwrap();
        assert_eq!(nature.len(), 1);
    }
}
