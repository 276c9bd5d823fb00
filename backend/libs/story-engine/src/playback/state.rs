use crate::models::{ContentKind, GroupOwnership, StoryGroup, StoryItem};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    Closed,
    Playing,
    Paused,
}

/// Live playback state for the single open overlay
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// `None` means the overlay is closed
    pub active_group: Option<StoryGroup>,
    /// Always inside `active_group.items` while a group is active
    pub index: usize,
    /// 0..=100
    pub progress_percent: f64,
    pub paused: bool,
    pub saved_progress_percent: f64,
    /// Duration the current item's progress is measured against
    pub target_duration: Duration,
    /// Whether `target_duration` came from the media player
    pub duration_reported: bool,
}

impl PlaybackState {
    pub fn closed(default_duration: Duration) -> Self {
        Self {
            active_group: None,
            index: 0,
            progress_percent: 0.0,
            paused: false,
            saved_progress_percent: 0.0,
            target_duration: default_duration,
            duration_reported: false,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        match (&self.active_group, self.paused) {
            (None, _) => PlaybackPhase::Closed,
            (Some(_), false) => PlaybackPhase::Playing,
            (Some(_), true) => PlaybackPhase::Paused,
        }
    }

    pub fn current_item(&self) -> Option<&StoryItem> {
        self.active_group
            .as_ref()
            .and_then(|group| group.items.get(self.index))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let Some(group) = self.active_group.as_ref() else {
            return PlaybackSnapshot::closed();
        };

        let item_progress = (0..group.items.len())
            .map(|i| match i.cmp(&self.index) {
                std::cmp::Ordering::Less => 100.0,
                std::cmp::Ordering::Equal => self.progress_percent,
                std::cmp::Ordering::Greater => 0.0,
            })
            .collect();
        let current = group.items.get(self.index);

        PlaybackSnapshot {
            phase: self.phase(),
            author_id: Some(group.author_id),
            ownership: Some(group.ownership),
            index: self.index,
            item_count: group.items.len(),
            story_id: current.map(|item| item.id),
            content_kind: current.map(|item| item.content.kind()),
            progress_percent: self.progress_percent,
            paused: self.paused,
            item_progress,
        }
    }
}

/// Render-ready copy of the playback state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub author_id: Option<Uuid>,
    /// `Own` lets the shell offer the viewer list
    pub ownership: Option<GroupOwnership>,
    pub index: usize,
    pub item_count: usize,
    pub story_id: Option<Uuid>,
    pub content_kind: Option<ContentKind>,
    pub progress_percent: f64,
    pub paused: bool,
    /// One bar per item: finished items 100, the current item its progress,
    /// upcoming items 0
    pub item_progress: Vec<f64>,
}

impl PlaybackSnapshot {
    pub fn closed() -> Self {
        Self {
            phase: PlaybackPhase::Closed,
            author_id: None,
            ownership: None,
            index: 0,
            item_count: 0,
            story_id: None,
            content_kind: None,
            progress_percent: 0.0,
            paused: false,
            item_progress: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase == PlaybackPhase::Closed
    }
}
