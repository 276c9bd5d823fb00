/// Viewer aggregator
///
/// Lists who has seen a story, most recent view first. Intended for the
/// story's author only; the store enforces that boundary and
/// `list_viewers_for` checks it again when the item is at hand.
use crate::error::{Result, StoryError};
use crate::metrics;
use crate::models::{Notice, StoryItem, ViewRecord};
use crate::store::StoryRecordStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Result of a viewer listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "viewers", rename_all = "snake_case")]
pub enum ViewerListing {
    /// Newest view first; empty means "no views yet"
    Viewers(Vec<ViewRecord>),
    /// The store failed; a notice was raised
    Unavailable,
}

impl ViewerListing {
    pub fn viewers(&self) -> &[ViewRecord] {
        match self {
            ViewerListing::Viewers(viewers) => viewers,
            ViewerListing::Unavailable => &[],
        }
    }
}

#[derive(Clone)]
pub struct ViewerAggregator {
    store: Arc<dyn StoryRecordStore>,
    notices: broadcast::Sender<Notice>,
}

impl ViewerAggregator {
    pub fn new(store: Arc<dyn StoryRecordStore>, notices: broadcast::Sender<Notice>) -> Self {
        Self { store, notices }
    }

    /// Viewers of `story_id`. The caller must be the story's author.
    pub async fn list_viewers(&self, story_id: Uuid) -> ViewerListing {
        match self.store.fetch_viewers(story_id).await {
            Ok(viewers) => {
                metrics::record_viewer_listing("loaded");
                ViewerListing::Viewers(order_by_recency(viewers))
            }
            Err(e) => {
                metrics::record_viewer_listing("unavailable");
                tracing::warn!(story_id = %story_id, error = %e, "Failed to load story viewers");
                let _ = self.notices.send(Notice::ViewersUnavailable { story_id });
                ViewerListing::Unavailable
            }
        }
    }

    /// Viewers of `item`, refusing anyone but its author
    pub async fn list_viewers_for(&self, item: &StoryItem, requester: Uuid) -> Result<ViewerListing> {
        if item.author_id != requester {
            metrics::record_viewer_listing("forbidden");
            return Err(StoryError::Forbidden(
                "only the author can list story viewers".into(),
            ));
        }
        Ok(self.list_viewers(item.id).await)
    }
}

/// Most recent view first; ties broken by viewer id for a stable order
pub fn order_by_recency(mut viewers: Vec<ViewRecord>) -> Vec<ViewRecord> {
    viewers.sort_by(|a, b| {
        b.viewed_at
            .cmp(&a.viewed_at)
            .then_with(|| a.viewer_id.cmp(&b.viewer_id))
    });
    viewers
}
