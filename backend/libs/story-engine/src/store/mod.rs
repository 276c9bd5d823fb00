/// Story record store boundary
///
/// The engine never touches persistence directly. Everything goes through
/// `StoryRecordStore`, implemented by:
/// - `PgStoryStore`: PostgreSQL via sqlx (production)
/// - `InMemoryStoryStore`: process-local store for tests and offline sessions
use crate::error::Result;
use crate::models::{AppendOutcome, StoryContent, StoryItem, ViewRecord};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStoryStore;
pub use postgres::PgStoryStore;

#[async_trait]
pub trait StoryRecordStore: Send + Sync {
    /// Unexpired stories visible to `viewer_id`, newest first
    async fn fetch_recent_stories(&self, viewer_id: Uuid, limit: i64) -> Result<Vec<StoryItem>>;

    /// Append a view. Duplicate pairs are a no-op, not an error.
    async fn append_view(&self, story_id: Uuid, viewer_id: Uuid) -> Result<AppendOutcome>;

    async fn create_story(&self, author_id: Uuid, content: &StoryContent) -> Result<StoryItem>;

    /// All recorded views for a story, in no particular order
    async fn fetch_viewers(&self, story_id: Uuid) -> Result<Vec<ViewRecord>>;

    /// Author of a live story, `None` when it does not exist or expired
    async fn story_author(&self, story_id: Uuid) -> Result<Option<Uuid>>;
}
