use super::StoryRecordStore;
use crate::error::{Result, StoryError};
use crate::models::{
    AppendOutcome, AuthorSummary, ContentKind, StoryContent, StoryItem, ViewRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashSet;
use uuid::Uuid;

/// Stories expire 24h after creation
const STORY_TTL_HOURS: i64 = 24;

const STORY_COLUMNS: &str = r#"
    s.id, s.user_id, s.content_type, s.content_url, s.caption, s.text_body,
    s.background_color, s.created_at, u.username, u.avatar_url
"#;

pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_story(row: &PgRow) -> Result<StoryItem> {
        let author_id: Uuid = row.try_get("user_id")?;
        let kind = ContentKind::try_from(row.try_get::<String, _>("content_type")?.as_str())?;
        let media_url = || -> Result<String> {
            row.try_get::<Option<String>, _>("content_url")?
                .ok_or_else(|| StoryError::InvalidPayload("media story without url".into()))
        };
        let caption: Option<String> = row.try_get("caption")?;

        let content = match kind {
            ContentKind::Text => StoryContent::Text {
                body: row
                    .try_get::<Option<String>, _>("text_body")?
                    .unwrap_or_default(),
                background_color: row
                    .try_get::<Option<String>, _>("background_color")?
                    .unwrap_or_else(|| "#000000".to_string()),
            },
            ContentKind::Image => StoryContent::Image {
                url: media_url()?,
                caption,
            },
            ContentKind::Video => StoryContent::Video {
                url: media_url()?,
                caption,
            },
            ContentKind::Audio => StoryContent::Audio {
                url: media_url()?,
                caption,
            },
        };

        let author = row
            .try_get::<Option<String>, _>("username")?
            .map(|username| -> Result<AuthorSummary> {
                Ok(AuthorSummary {
                    id: author_id,
                    username,
                    avatar_url: row.try_get("avatar_url")?,
                })
            })
            .transpose()?;

        Ok(StoryItem {
            id: row.try_get("id")?,
            author_id,
            author,
            created_at: row.try_get("created_at")?,
            content,
            viewer_ids: HashSet::new(),
        })
    }
}

#[async_trait]
impl StoryRecordStore for PgStoryStore {
    async fn fetch_recent_stories(&self, viewer_id: Uuid, limit: i64) -> Result<Vec<StoryItem>> {
        // Viewer's own stories plus stories of followed authors. Only the
        // viewer's own view is projected into viewer_ids; other viewers are
        // visible to the author through fetch_viewers.
        let query = format!(
            r#"
            SELECT {STORY_COLUMNS},
                   EXISTS(
                       SELECT 1 FROM story_views v
                       WHERE v.story_id = s.id AND v.viewer_id = $1
                   ) AS viewed_by_viewer
            FROM stories s
            LEFT JOIN users u ON u.id = s.user_id AND u.deleted_at IS NULL
            WHERE s.deleted_at IS NULL AND s.expires_at > NOW()
              AND (
                    s.user_id = $1
                 OR EXISTS (
                        SELECT 1 FROM follows f
                        WHERE f.follower_id = $1 AND f.following_id = s.user_id
                    )
              )
            ORDER BY s.created_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query(&query)
            .bind(viewer_id)
            .bind(limit.clamp(1, 500))
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut item = match Self::row_to_story(row) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed story row");
                    continue;
                }
            };
            if row.try_get::<bool, _>("viewed_by_viewer")? {
                item.viewer_ids.insert(viewer_id);
            }
            items.push(item);
        }
        Ok(items)
    }

    async fn append_view(&self, story_id: Uuid, viewer_id: Uuid) -> Result<AppendOutcome> {
        let result = sqlx::query(
            r#"INSERT INTO story_views (story_id, viewer_id, viewed_at) VALUES ($1, $2, NOW())
               ON CONFLICT (story_id, viewer_id) DO NOTHING"#,
        )
        .bind(story_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(story_id = %story_id, viewer_id = %viewer_id, "Story view recorded");
            Ok(AppendOutcome::Recorded)
        } else {
            Ok(AppendOutcome::Duplicate)
        }
    }

    async fn create_story(&self, author_id: Uuid, content: &StoryContent) -> Result<StoryItem> {
        content.validate()?;
        let expires_at: DateTime<Utc> = Utc::now() + Duration::hours(STORY_TTL_HOURS);
        let (text_body, background_color) = match content {
            StoryContent::Text {
                body,
                background_color,
            } => (Some(body.as_str()), Some(background_color.as_str())),
            _ => (None, None),
        };

        let query = format!(
            r#"
            WITH inserted AS (
                INSERT INTO stories (user_id, content_type, content_url, caption, text_body, background_color, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {STORY_COLUMNS}
            FROM inserted s
            LEFT JOIN users u ON u.id = s.user_id AND u.deleted_at IS NULL
            "#
        );

        let row = sqlx::query(&query)
            .bind(author_id)
            .bind(content.kind().as_str())
            .bind(content.media_url())
            .bind(content.caption())
            .bind(text_body)
            .bind(background_color)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;

        let item = Self::row_to_story(&row)?;
        tracing::info!(story_id = %item.id, author_id = %author_id, kind = content.kind().as_str(), "Story created");
        Ok(item)
    }

    async fn fetch_viewers(&self, story_id: Uuid) -> Result<Vec<ViewRecord>> {
        let rows = sqlx::query(
            r#"SELECT story_id, viewer_id, viewed_at FROM story_views WHERE story_id = $1"#,
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ViewRecord {
                    story_id: row.try_get("story_id")?,
                    viewer_id: row.try_get("viewer_id")?,
                    viewed_at: row.try_get("viewed_at")?,
                })
            })
            .collect()
    }

    async fn story_author(&self, story_id: Uuid) -> Result<Option<Uuid>> {
        let author: Option<(Uuid,)> = sqlx::query_as(
            r#"SELECT user_id FROM stories
               WHERE id = $1 AND deleted_at IS NULL AND expires_at > NOW()"#,
        )
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author.map(|t| t.0))
    }
}
