/// Data models for the story engine
///
/// - `StoryItem`: a single short-lived post as returned by the record store
/// - `StoryContent`: tagged union over the four content kinds
/// - `StoryGroup`: derived per-author sequence, never persisted
/// - `ViewRecord`: one (story, viewer) view, unique per pair
use crate::error::{Result, StoryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Maximum text story length accepted on create
pub const MAX_TEXT_LEN: usize = 500;

/// Maximum caption length accepted on create
pub const MAX_CAPTION_LEN: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Audio,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
        }
    }
}

impl TryFrom<&str> for ContentKind {
    type Error = StoryError;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            "audio" => Ok(ContentKind::Audio),
            other => Err(StoryError::InvalidPayload(format!(
                "unknown content type '{}'",
                other
            ))),
        }
    }
}

/// Where the progress bar of an item gets its position from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// 100-step countdown over the configured default duration
    Countdown,
    /// 100-step countdown over the duration reported by the media player
    ReportedCountdown,
    /// Playback position reported by the audio player; ends on its end signal
    PlaybackPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoryContent {
    Text {
        body: String,
        background_color: String,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
}

impl StoryContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            StoryContent::Text { .. } => ContentKind::Text,
            StoryContent::Image { .. } => ContentKind::Image,
            StoryContent::Video { .. } => ContentKind::Video,
            StoryContent::Audio { .. } => ContentKind::Audio,
        }
    }

    pub fn progress_source(&self) -> ProgressSource {
        match self {
            StoryContent::Text { .. } | StoryContent::Image { .. } => ProgressSource::Countdown,
            StoryContent::Video { .. } => ProgressSource::ReportedCountdown,
            StoryContent::Audio { .. } => ProgressSource::PlaybackPosition,
        }
    }

    pub fn media_url(&self) -> Option<&str> {
        match self {
            StoryContent::Text { .. } => None,
            StoryContent::Image { url, .. }
            | StoryContent::Video { url, .. }
            | StoryContent::Audio { url, .. } => Some(url),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            StoryContent::Text { .. } => None,
            StoryContent::Image { caption, .. }
            | StoryContent::Video { caption, .. }
            | StoryContent::Audio { caption, .. } => caption.as_deref(),
        }
    }

    /// Validate a payload before it is handed to the record store
    pub fn validate(&self) -> Result<()> {
        match self {
            StoryContent::Text {
                body,
                background_color,
            } => {
                if body.trim().is_empty() {
                    return Err(StoryError::InvalidPayload("text body required".into()));
                }
                if body.chars().count() > MAX_TEXT_LEN {
                    return Err(StoryError::InvalidPayload(format!(
                        "text body exceeds {} characters",
                        MAX_TEXT_LEN
                    )));
                }
                if !is_hex_color(background_color) {
                    return Err(StoryError::InvalidPayload(
                        "background_color must be #RRGGBB".into(),
                    ));
                }
            }
            StoryContent::Image { url, caption }
            | StoryContent::Video { url, caption }
            | StoryContent::Audio { url, caption } => {
                if url.trim().is_empty() {
                    return Err(StoryError::InvalidPayload("media url required".into()));
                }
                if caption
                    .as_ref()
                    .is_some_and(|c| c.chars().count() > MAX_CAPTION_LEN)
                {
                    return Err(StoryError::InvalidPayload(format!(
                        "caption exceeds {} characters",
                        MAX_CAPTION_LEN
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Profile fields the record store joins onto each story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    /// Placeholder used for the viewer's own group when the profile is missing
    pub fn unresolved(id: Uuid) -> Self {
        Self {
            id,
            username: String::new(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    pub id: Uuid,
    pub author_id: Uuid,
    /// `None` when the author's profile could not be resolved
    pub author: Option<AuthorSummary>,
    pub created_at: DateTime<Utc>,
    pub content: StoryContent,
    #[serde(default)]
    pub viewer_ids: HashSet<Uuid>,
}

impl StoryItem {
    pub fn is_viewed_by(&self, viewer_id: Uuid) -> bool {
        self.viewer_ids.contains(&viewer_id)
    }
}

/// Whether a group belongs to the current viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOwnership {
    Own,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryGroup {
    pub author_id: Uuid,
    pub author: AuthorSummary,
    pub ownership: GroupOwnership,
    /// Oldest first
    pub items: Vec<StoryItem>,
    pub fully_viewed: bool,
}

impl StoryGroup {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub story_id: Uuid,
    pub viewer_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

/// Outcome of an idempotent view append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    /// First view for the pair
    Recorded,
    /// Pair already present, nothing written
    Duplicate,
}

/// Non-fatal, user-visible notices raised while the engine degrades
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The story feed could not be loaded; the shell shows a retryable empty state
    StoriesUnavailable,
    /// A view could not be recorded
    ViewNotRecorded { story_id: Uuid },
    /// The viewer list for a story could not be shown
    ViewersUnavailable { story_id: Uuid },
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::StoriesUnavailable => "failed to load stories",
            Notice::ViewNotRecorded { .. } => "could not record view",
            Notice::ViewersUnavailable { .. } => "could not show views",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_source_per_kind() {
        let text = StoryContent::Text {
            body: "hi".into(),
            background_color: "#112233".into(),
        };
        let audio = StoryContent::Audio {
            url: "https://cdn/a.m4a".into(),
            caption: None,
        };
        let video = StoryContent::Video {
            url: "https://cdn/v.mp4".into(),
            caption: None,
        };
        assert_eq!(text.progress_source(), ProgressSource::Countdown);
        assert_eq!(video.progress_source(), ProgressSource::ReportedCountdown);
        assert_eq!(audio.progress_source(), ProgressSource::PlaybackPosition);
    }

    #[test]
    fn test_content_serde_tag() {
        let content = StoryContent::Image {
            url: "https://cdn/i.jpg".into(),
            caption: Some("sunset".into()),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["caption"], "sunset");
    }

    #[test]
    fn test_validate_rejects_bad_payloads() {
        let blank = StoryContent::Text {
            body: "  ".into(),
            background_color: "#000000".into(),
        };
        assert!(blank.validate().is_err());

        let bad_color = StoryContent::Text {
            body: "hello".into(),
            background_color: "red".into(),
        };
        assert!(bad_color.validate().is_err());

        let no_url = StoryContent::Video {
            url: String::new(),
            caption: None,
        };
        assert!(no_url.validate().is_err());

        let ok = StoryContent::Audio {
            url: "https://cdn/a.m4a".into(),
            caption: Some("listen".into()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_content_kind_round_trip_names() {
        for kind in [
            ContentKind::Text,
            ContentKind::Image,
            ContentKind::Video,
            ContentKind::Audio,
        ] {
            assert_eq!(ContentKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(ContentKind::try_from("gif").is_err());
    }
}
