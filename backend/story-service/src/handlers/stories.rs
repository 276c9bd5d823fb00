/// Story handlers - HTTP endpoints for story operations
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use story_engine::grouping::{build_groups, build_self_group};
use story_engine::{
    metrics as engine_metrics, AppendOutcome, EngineConfig, Notice, StoryContent, StoryGroup,
    StoryRecordStore, ViewRecord, ViewerAggregator, ViewerListing,
};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Shared state for story handlers
pub struct StoryHandlerState {
    pub store: Arc<dyn StoryRecordStore>,
    pub aggregator: ViewerAggregator,
    pub engine: EngineConfig,
}

impl StoryHandlerState {
    pub fn new(store: Arc<dyn StoryRecordStore>, engine: EngineConfig) -> Self {
        // Handlers answer synchronously, so notices are only informational here
        let (notices, _) = broadcast::channel(engine.notice_capacity.max(1));
        Self {
            aggregator: ViewerAggregator::new(store.clone(), notices),
            store,
            engine,
        }
    }
}

#[derive(Serialize)]
pub struct StoryGroupsResponse {
    pub groups: Vec<StoryGroup>,
    pub self_group: StoryGroup,
}

#[derive(Serialize)]
pub struct RecordViewResponse {
    pub recorded: bool,
}

#[derive(Serialize)]
pub struct ViewersResponse {
    pub story_id: Uuid,
    pub viewers: Vec<ViewRecord>,
}

/// Story feed grouped by author, plus the caller's own group
pub async fn list_story_groups(
    state: web::Data<StoryHandlerState>,
    user: UserId,
) -> Result<HttpResponse> {
    let items = state
        .store
        .fetch_recent_stories(user.0, state.engine.feed_limit)
        .await
        .map_err(|e| {
            tracing::warn!(viewer_id = %user.0, error = %e, "Failed to load stories");
            AppError::Unavailable(Notice::StoriesUnavailable.message().to_string())
        })?;

    let response = StoryGroupsResponse {
        groups: build_groups(&items, Some(user.0)),
        self_group: build_self_group(&items, user.0),
    };
    tracing::debug!(
        viewer_id = %user.0,
        items = items.len(),
        groups = response.groups.len(),
        "Story groups built"
    );

    Ok(HttpResponse::Ok().json(response))
}

/// Create a new story
pub async fn create_story(
    state: web::Data<StoryHandlerState>,
    user: UserId,
    req: web::Json<StoryContent>,
) -> Result<HttpResponse> {
    let content = req.into_inner();
    content.validate()?;

    let story = state.store.create_story(user.0, &content).await?;
    tracing::info!(
        story_id = %story.id,
        author_id = %user.0,
        kind = content.kind().as_str(),
        "Story created"
    );

    Ok(HttpResponse::Created().json(story))
}

/// Record that the caller viewed a story. Repeated calls are no-ops.
pub async fn record_story_view(
    state: web::Data<StoryHandlerState>,
    story_id: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let story_id = story_id.into_inner();
    if state.store.story_author(story_id).await?.is_none() {
        return Err(AppError::NotFound(format!("story {}", story_id)));
    }

    let outcome = match state.store.append_view(story_id, user.0).await {
        Ok(outcome) => outcome,
        Err(e) => {
            engine_metrics::record_view_outcome("failed");
            return Err(e.into());
        }
    };
    let recorded = outcome == AppendOutcome::Recorded;
    engine_metrics::record_view_outcome(if recorded { "recorded" } else { "duplicate" });

    Ok(HttpResponse::Ok().json(RecordViewResponse { recorded }))
}

/// Viewers of a story, newest first. Only the story's author may ask.
pub async fn list_story_viewers(
    state: web::Data<StoryHandlerState>,
    story_id: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let story_id = story_id.into_inner();
    let author_id = state
        .store
        .story_author(story_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("story {}", story_id)))?;

    if author_id != user.0 {
        engine_metrics::record_viewer_listing("forbidden");
        tracing::warn!(story_id = %story_id, requester = %user.0, "Viewer list refused");
        return Err(AppError::Forbidden(
            "only the author can list story viewers".to_string(),
        ));
    }

    match state.aggregator.list_viewers(story_id).await {
        ViewerListing::Viewers(viewers) => {
            Ok(HttpResponse::Ok().json(ViewersResponse { story_id, viewers }))
        }
        ViewerListing::Unavailable => Err(AppError::Unavailable(
            Notice::ViewersUnavailable { story_id }.message().to_string(),
        )),
    }
}
