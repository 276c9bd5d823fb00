/// View recorder
///
/// Emits one `append_view` per item that becomes the display target. Calls are
/// spawned and never awaited by playback: a slow or failing store degrades to
/// a `Notice::ViewNotRecorded`, it never stalls `advance`. Idempotence is the
/// store's uniqueness constraint, so repeated calls for the same pair (for
/// example after the overlay is reopened) are safe.
use crate::metrics;
use crate::models::{AppendOutcome, Notice};
use crate::store::StoryRecordStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Clone)]
pub struct ViewRecorder {
    store: Arc<dyn StoryRecordStore>,
    notices: broadcast::Sender<Notice>,
}

impl ViewRecorder {
    pub fn new(store: Arc<dyn StoryRecordStore>, notices: broadcast::Sender<Notice>) -> Self {
        Self { store, notices }
    }

    /// Fire-and-forget. The returned handle may be dropped; the append keeps
    /// running in the background.
    pub fn record_view(&self, story_id: Uuid, viewer_id: Uuid) -> JoinHandle<Option<AppendOutcome>> {
        let recorder = self.clone();
        tokio::spawn(async move { recorder.append(story_id, viewer_id).await })
    }

    /// Perform the append inline. Failures are reported, not returned.
    pub async fn append(&self, story_id: Uuid, viewer_id: Uuid) -> Option<AppendOutcome> {
        match self.store.append_view(story_id, viewer_id).await {
            Ok(outcome) => {
                match outcome {
                    AppendOutcome::Recorded => metrics::record_view_outcome("recorded"),
                    AppendOutcome::Duplicate => metrics::record_view_outcome("duplicate"),
                }
                tracing::debug!(
                    story_id = %story_id,
                    viewer_id = %viewer_id,
                    outcome = ?outcome,
                    "Story view appended"
                );
                Some(outcome)
            }
            Err(e) => {
                metrics::record_view_outcome("failed");
                tracing::warn!(
                    story_id = %story_id,
                    viewer_id = %viewer_id,
                    error = %e,
                    "Failed to record story view"
                );
                // no subscribers is fine
                let _ = self.notices.send(Notice::ViewNotRecorded { story_id });
                None
            }
        }
    }
}
