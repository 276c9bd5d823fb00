//! HTTP tests for the story endpoints, backed by the in-memory store

use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use story_engine::{
    AuthorSummary, EngineConfig, InMemoryStoryStore, StoryContent, StoryRecordStore, ViewRecord,
};
use story_service::handlers::StoryHandlerState;
use uuid::Uuid;

fn state(store: Arc<InMemoryStoryStore>) -> web::Data<StoryHandlerState> {
    web::Data::new(StoryHandlerState::new(store, EngineConfig::default()))
}

async fn seed_author(store: &InMemoryStoryStore, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    store
        .insert_profile(AuthorSummary {
            id,
            username: username.into(),
            avatar_url: None,
        })
        .await;
    id
}

fn image() -> StoryContent {
    StoryContent::Image {
        url: "https://cdn.nova.dev/stories/a.jpg".into(),
        caption: None,
    }
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(state($store.clone()))
                .configure(story_service::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_missing_identity_is_unauthorized() {
    let store = Arc::new(InMemoryStoryStore::new());
    let app = app!(store);

    // the identity middleware rejects before routing, so the error comes back
    // as a service error rather than a rendered response
    let req = test::TestRequest::get()
        .uri("/api/v1/stories/groups")
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);

    let req = test::TestRequest::get()
        .uri("/api/v1/stories/groups")
        .insert_header(("X-User-Id", "not-a-uuid"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);
}

#[actix_web::test]
async fn test_groups_follow_first_appearance_order() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = seed_author(&store, "alice").await;
    let bob = seed_author(&store, "bob").await;
    let viewer = seed_author(&store, "viewer").await;
    store.create_story(alice, &image()).await.unwrap();
    store.create_story(bob, &image()).await.unwrap();
    let latest = store.create_story(alice, &image()).await.unwrap();
    store.append_view(latest.id, viewer).await.unwrap();
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/v1/stories/groups")
        .insert_header(("X-User-Id", viewer.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["author_id"], json!(alice));
    assert_eq!(groups[0]["items"].as_array().unwrap().len(), 2);
    assert_eq!(groups[0]["fully_viewed"], json!(false));
    assert_eq!(groups[1]["author_id"], json!(bob));
    assert_eq!(body["self_group"]["author_id"], json!(viewer));
    assert!(body["self_group"]["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_groups_unavailable_is_retryable() {
    let store = Arc::new(InMemoryStoryStore::new());
    store.set_available(false);
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/v1/stories/groups")
        .insert_header(("X-User-Id", Uuid::new_v4().to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "failed to load stories");
    assert_eq!(body["retryable"], json!(true));
}

#[actix_web::test]
async fn test_create_story_validates_payload() {
    let store = Arc::new(InMemoryStoryStore::new());
    let author = seed_author(&store, "alice").await;
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/stories")
        .insert_header(("X-User-Id", author.to_string()))
        .set_json(json!({
            "kind": "text",
            "body": "good morning",
            "background_color": "#ffaa00"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["author_id"], json!(author));
    assert_eq!(created["content"]["kind"], "text");

    let req = test::TestRequest::post()
        .uri("/api/v1/stories")
        .insert_header(("X-User-Id", author.to_string()))
        .set_json(json!({
            "kind": "text",
            "body": "x".repeat(501),
            "background_color": "#ffaa00"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_record_view_is_idempotent() {
    let store = Arc::new(InMemoryStoryStore::new());
    let author = seed_author(&store, "alice").await;
    let story = store.create_story(author, &image()).await.unwrap();
    let viewer = Uuid::new_v4();
    let app = app!(store);

    for expected in [true, false] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/stories/{}/views", story.id))
            .insert_header(("X-User-Id", viewer.to_string()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["recorded"], json!(expected));
    }
    assert_eq!(store.view_count(story.id, viewer).await, 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/stories/{}/views", Uuid::new_v4()))
        .insert_header(("X-User-Id", viewer.to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_viewers_only_for_author() {
    let store = Arc::new(InMemoryStoryStore::new());
    let author = seed_author(&store, "alice").await;
    let story = store.create_story(author, &image()).await.unwrap();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let now = Utc::now();
    for (viewer_id, minutes_ago) in [(first, 20), (second, 5)] {
        store
            .insert_view(ViewRecord {
                story_id: story.id,
                viewer_id,
                viewed_at: now - Duration::minutes(minutes_ago),
            })
            .await;
    }
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/stories/{}/viewers", story.id))
        .insert_header(("X-User-Id", first.to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/stories/{}/viewers", story.id))
        .insert_header(("X-User-Id", author.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let viewers = body["viewers"].as_array().unwrap();
    assert_eq!(viewers.len(), 2);
    // newest first
    assert_eq!(viewers[0]["viewer_id"], json!(second));
}

#[actix_web::test]
async fn test_health_without_database() {
    let store = Arc::new(InMemoryStoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "story-service");
}
