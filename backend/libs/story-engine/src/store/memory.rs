//! In-memory story record store
//!
//! Mirrors the PostgreSQL store contract: views are unique per
//! (story, viewer) and the feed comes back newest first. An availability
//! switch lets tests exercise the degraded paths.

use super::StoryRecordStore;
use crate::error::{Result, StoryError};
use crate::models::{AppendOutcome, AuthorSummary, StoryContent, StoryItem, ViewRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    stories: Vec<StoryItem>,
    views: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    profiles: HashMap<Uuid, AuthorSummary>,
}

pub struct InMemoryStoryStore {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

impl Default for InMemoryStoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability; while unavailable every call fails with
    /// `RecordStoreUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn insert_profile(&self, profile: AuthorSummary) {
        self.state.write().await.profiles.insert(profile.id, profile);
    }

    /// Seed a story as-is (keeps its id and timestamp)
    pub async fn insert_story(&self, item: StoryItem) {
        let mut state = self.state.write().await;
        for viewer_id in &item.viewer_ids {
            state
                .views
                .entry((item.id, *viewer_id))
                .or_insert(item.created_at);
        }
        state.stories.push(item);
    }

    /// Seed a view with an explicit timestamp
    pub async fn insert_view(&self, record: ViewRecord) {
        self.state
            .write()
            .await
            .views
            .entry((record.story_id, record.viewer_id))
            .or_insert(record.viewed_at);
    }

    pub async fn view_count(&self, story_id: Uuid, viewer_id: Uuid) -> usize {
        usize::from(
            self.state
                .read()
                .await
                .views
                .contains_key(&(story_id, viewer_id)),
        )
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoryError::RecordStoreUnavailable(
                "in-memory store marked unavailable".into(),
            ))
        }
    }
}

#[async_trait]
impl StoryRecordStore for InMemoryStoryStore {
    async fn fetch_recent_stories(&self, _viewer_id: Uuid, limit: i64) -> Result<Vec<StoryItem>> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut items: Vec<StoryItem> = state
            .stories
            .iter()
            .map(|story| {
                let mut item = story.clone();
                if item.author.is_none() {
                    item.author = state.profiles.get(&item.author_id).cloned();
                }
                item.viewer_ids.extend(
                    state
                        .views
                        .keys()
                        .filter(|(story_id, _)| *story_id == item.id)
                        .map(|(_, viewer_id)| *viewer_id),
                );
                item
            })
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit.clamp(1, 500) as usize);
        Ok(items)
    }

    async fn append_view(&self, story_id: Uuid, viewer_id: Uuid) -> Result<AppendOutcome> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if state.views.contains_key(&(story_id, viewer_id)) {
            return Ok(AppendOutcome::Duplicate);
        }
        state.views.insert((story_id, viewer_id), Utc::now());
        Ok(AppendOutcome::Recorded)
    }

    async fn create_story(&self, author_id: Uuid, content: &StoryContent) -> Result<StoryItem> {
        self.ensure_available()?;
        content.validate()?;
        let mut state = self.state.write().await;
        let item = StoryItem {
            id: Uuid::new_v4(),
            author_id,
            author: state.profiles.get(&author_id).cloned(),
            created_at: Utc::now(),
            content: content.clone(),
            viewer_ids: Default::default(),
        };
        state.stories.push(item.clone());
        Ok(item)
    }

    async fn fetch_viewers(&self, story_id: Uuid) -> Result<Vec<ViewRecord>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .views
            .iter()
            .filter(|((id, _), _)| *id == story_id)
            .map(|((story_id, viewer_id), viewed_at)| ViewRecord {
                story_id: *story_id,
                viewer_id: *viewer_id,
                viewed_at: *viewed_at,
            })
            .collect())
    }

    async fn story_author(&self, story_id: Uuid) -> Result<Option<Uuid>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .stories
            .iter()
            .find(|story| story.id == story_id)
            .map(|story| story.author_id))
    }
}
