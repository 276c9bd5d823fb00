//! Integration tests for the playback session
//!
//! Coverage:
//! - Manual navigation within and across author groups
//! - Timer-driven auto-advance (100 steps over the item duration)
//! - Pause/resume without drift
//! - Audio progress following the playback clock
//! - Late-arriving video durations
//! - View recording (once per displayed item, idempotent, non-blocking)
//! - Degradation notices when the record store fails
//!
//! Timer tests run on a paused tokio clock so they are deterministic.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use story_engine::{
    AuthorSummary, EngineConfig, InMemoryStoryStore, Notice, PlaybackPhase, PlaybackSession,
    SessionHandle, StoryContent, StoryError, StoryItem,
};
use tokio::time::sleep;
use uuid::Uuid;

struct Fixture {
    store: Arc<InMemoryStoryStore>,
    session: SessionHandle,
    viewer: Uuid,
}

fn base_time() -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(2)
}

fn image(n: usize) -> StoryContent {
    StoryContent::Image {
        url: format!("https://cdn.nova.dev/stories/{}.jpg", n),
        caption: None,
    }
}

fn text(body: &str) -> StoryContent {
    StoryContent::Text {
        body: body.into(),
        background_color: "#1d3557".into(),
    }
}

fn audio() -> StoryContent {
    StoryContent::Audio {
        url: "https://cdn.nova.dev/stories/voice.m4a".into(),
        caption: None,
    }
}

fn video() -> StoryContent {
    StoryContent::Video {
        url: "https://cdn.nova.dev/stories/clip.mp4".into(),
        caption: Some("clip".into()),
    }
}

async fn author(store: &InMemoryStoryStore, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    store
        .insert_profile(AuthorSummary {
            id,
            username: name.into(),
            avatar_url: None,
        })
        .await;
    id
}

async fn story(
    store: &InMemoryStoryStore,
    author_id: Uuid,
    minutes: i64,
    content: StoryContent,
) -> Uuid {
    let id = Uuid::new_v4();
    store
        .insert_story(StoryItem {
            id,
            author_id,
            author: None,
            created_at: base_time() + ChronoDuration::minutes(minutes),
            content,
            viewer_ids: HashSet::new(),
        })
        .await;
    id
}

async fn start(store: Arc<InMemoryStoryStore>) -> Fixture {
    let viewer = Uuid::new_v4();
    let session = PlaybackSession::spawn(EngineConfig::default(), store.clone(), Some(viewer));
    Fixture {
        store,
        session,
        viewer,
    }
}

/// Round-trip through the session so earlier fire-and-forget commands are
/// handled, then let spawned view appends run.
async fn settle(session: &SessionHandle) {
    session.groups().await.unwrap();
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_advance_through_single_group_then_close() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    for minute in 0..3 {
        story(&store, alice, minute, image(minute as usize)).await;
    }
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    fx.session.open_group(alice, 0).await.unwrap();
    fx.session.advance().await.unwrap();
    let snapshot = fx.session.advance().await.unwrap();
    assert_eq!(snapshot.phase, PlaybackPhase::Playing);
    assert_eq!(snapshot.author_id, Some(alice));
    assert_eq!(snapshot.index, 2);

    let snapshot = fx.session.advance().await.unwrap();
    assert!(snapshot.is_closed());
    assert!(fx.session.snapshot().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_feed_grouping_by_first_appearance() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    let bob = author(&store, "bob").await;
    let alice_1 = story(&store, alice, 0, image(1)).await;
    story(&store, bob, 5, image(2)).await;
    let alice_2 = story(&store, alice, 10, image(3)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    // feed (newest first): Alice-item2, Bob-item1, Alice-item1
    let groups = fx.session.groups().await.unwrap();
    let authors: Vec<Uuid> = groups.iter().map(|g| g.author_id).collect();
    assert_eq!(authors, vec![alice, bob]);
    let alice_items: Vec<Uuid> = groups[0].items.iter().map(|i| i.id).collect();
    assert_eq!(alice_items, vec![alice_1, alice_2]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_auto_advances_after_item_duration() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    story(&store, alice, 0, text("first")).await;
    story(&store, alice, 1, text("second")).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    fx.session.open_group(alice, 0).await.unwrap();
    sleep(Duration::from_millis(5_050)).await;
    let snapshot = fx.session.snapshot();
    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.progress_percent, 50.0);

    sleep(Duration::from_millis(5_000)).await;
    let snapshot = fx.session.snapshot();
    assert_eq!(snapshot.index, 1);
    assert_eq!(snapshot.progress_percent, 0.0);
    assert_eq!(snapshot.item_progress, vec![100.0, 0.0]);

    // last item of the last group runs out: overlay closes
    sleep(Duration::from_millis(10_000)).await;
    assert!(fx.session.snapshot().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_pause_resume_does_not_drift() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    story(&store, alice, 0, image(0)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();
    fx.session.open_group(alice, 0).await.unwrap();

    sleep(Duration::from_millis(3_050)).await;
    let paused = fx.session.pause().await.unwrap();
    assert_eq!(paused.phase, PlaybackPhase::Paused);
    assert!(paused.paused);
    assert_eq!(paused.progress_percent, 30.0);

    // immediate resume: no change
    let resumed = fx.session.resume().await.unwrap();
    assert_eq!(resumed.progress_percent, 30.0);
    fx.session.pause().await.unwrap();

    // a long hold does not move progress
    sleep(Duration::from_millis(5_000)).await;
    assert_eq!(fx.session.snapshot().progress_percent, 30.0);

    let resumed = fx.session.resume().await.unwrap();
    assert_eq!(resumed.phase, PlaybackPhase::Playing);
    assert_eq!(resumed.progress_percent, 30.0);

    // timer restarts from the saved point: 19 steps in 1.95s
    sleep(Duration::from_millis(1_950)).await;
    assert_eq!(fx.session.snapshot().progress_percent, 49.0);
}

#[tokio::test(start_paused = true)]
async fn test_audio_follows_playback_clock_and_end_signal() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    let bob = author(&store, "bob").await;
    let voice = story(&store, alice, 10, audio()).await;
    story(&store, bob, 5, image(0)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    fx.session.open_group(alice, 0).await.unwrap();

    // no generic timer for audio
    sleep(Duration::from_secs(30)).await;
    let snapshot = fx.session.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Playing);
    assert_eq!(snapshot.story_id, Some(voice));
    assert_eq!(snapshot.progress_percent, 0.0);

    fx.session
        .report_audio_progress(
            voice,
            Duration::from_secs_f64(3.5),
            Some(Duration::from_secs(7)),
        )
        .unwrap();
    settle(&fx.session).await;
    assert!((fx.session.snapshot().progress_percent - 50.0).abs() < 1e-9);

    fx.session
        .report_audio_progress(voice, Duration::from_secs_f64(5.25), None)
        .unwrap();
    settle(&fx.session).await;
    assert!((fx.session.snapshot().progress_percent - 75.0).abs() < 1e-9);

    fx.session.audio_ended(voice).unwrap();
    settle(&fx.session).await;
    let snapshot = fx.session.snapshot();
    assert_eq!(snapshot.author_id, Some(bob));
    assert_eq!(snapshot.index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_video_duration_rescales_countdown() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    let clip = story(&store, alice, 0, video()).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();
    fx.session.open_group(alice, 0).await.unwrap();

    // fallback duration (10s) until the player reports
    sleep(Duration::from_millis(2_050)).await;
    assert_eq!(fx.session.snapshot().progress_percent, 20.0);

    fx.session
        .report_media_duration(clip, Duration::from_secs(20))
        .unwrap();
    settle(&fx.session).await;
    assert_eq!(fx.session.snapshot().progress_percent, 20.0);

    // 200ms per step from now on
    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(fx.session.snapshot().progress_percent, 25.0);
}

#[tokio::test(start_paused = true)]
async fn test_views_recorded_once_per_item() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    let first = story(&store, alice, 0, image(0)).await;
    let second = story(&store, alice, 1, image(1)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    fx.session.open_group(alice, 0).await.unwrap();
    settle(&fx.session).await;
    assert_eq!(fx.store.view_count(first, fx.viewer).await, 1);
    assert_eq!(fx.store.view_count(second, fx.viewer).await, 0);

    // progress ticks do not record again
    sleep(Duration::from_secs(3)).await;
    fx.session.advance().await.unwrap();
    fx.session.retreat().await.unwrap();
    fx.session.close_overlay().await.unwrap();
    fx.session.open_group(alice, 0).await.unwrap();
    settle(&fx.session).await;

    assert_eq!(fx.store.view_count(first, fx.viewer).await, 1);
    assert_eq!(fx.store.view_count(second, fx.viewer).await, 1);

    let groups = fx.session.groups().await.unwrap();
    assert!(groups[0].fully_viewed);
}

#[tokio::test(start_paused = true)]
async fn test_record_failure_does_not_block_playback() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    let first = story(&store, alice, 0, image(0)).await;
    story(&store, alice, 1, image(1)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();
    let mut notices = fx.session.notices();

    fx.store.set_available(false);
    fx.session.open_group(alice, 0).await.unwrap();
    let snapshot = fx.session.advance().await.unwrap();
    assert_eq!(snapshot.index, 1);
    settle(&fx.session).await;

    // one notice per displayed item
    let received = vec![notices.recv().await.unwrap(), notices.recv().await.unwrap()];
    assert!(received.contains(&Notice::ViewNotRecorded { story_id: first }));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_surfaces_notice() {
    let store = Arc::new(InMemoryStoryStore::new());
    store.set_available(false);
    let fx = start(store).await;
    let mut notices = fx.session.notices();

    let err = fx.session.refresh(fx.viewer).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(notices.recv().await.unwrap(), Notice::StoriesUnavailable);
    assert!(fx.session.groups().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_self_group_is_not_opened() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    story(&store, alice, 0, image(0)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    let own = fx.session.self_group().await.unwrap().unwrap();
    assert!(own.is_empty());
    let err = fx.session.open_self_group().await.unwrap_err();
    assert_eq!(err, StoryError::EmptyGroup(fx.viewer));
    assert!(fx.session.snapshot().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_own_group_plays_for_its_author() {
    let store = Arc::new(InMemoryStoryStore::new());
    let fx = start(store.clone()).await;
    store
        .insert_profile(AuthorSummary {
            id: fx.viewer,
            username: "me".into(),
            avatar_url: None,
        })
        .await;
    story(&store, fx.viewer, 0, text("my day")).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    let snapshot = fx.session.open_self_group().await.unwrap();
    assert_eq!(snapshot.author_id, Some(fx.viewer));
    assert_eq!(snapshot.ownership, Some(story_engine::GroupOwnership::Own));
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_rejects_gestures() {
    let store = Arc::new(InMemoryStoryStore::new());
    let fx = start(store).await;

    for result in [
        fx.session.advance().await,
        fx.session.retreat().await,
        fx.session.pause().await,
        fx.session.resume().await,
    ] {
        assert!(matches!(result, Err(StoryError::InvalidGroupReference(_))));
    }
    assert!(fx.session.close_overlay().await.unwrap().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_retreat_at_first_item_of_first_group_is_noop() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    story(&store, alice, 0, image(0)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();

    fx.session.open_group(alice, 0).await.unwrap();
    sleep(Duration::from_millis(1_250)).await;
    let before = fx.session.snapshot();
    let after = fx.session.retreat().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_stream_publishes_transitions() {
    let store = Arc::new(InMemoryStoryStore::new());
    let alice = author(&store, "alice").await;
    story(&store, alice, 0, image(0)).await;
    let fx = start(store).await;
    fx.session.refresh(fx.viewer).await.unwrap();
    let mut snapshots = fx.session.subscribe();

    fx.session.open_group(alice, 0).await.unwrap();
    snapshots.changed().await.unwrap();
    assert_eq!(snapshots.borrow_and_update().phase, PlaybackPhase::Playing);

    fx.session.pause().await.unwrap();
    snapshots.changed().await.unwrap();
    assert!(snapshots.borrow_and_update().paused);

    fx.session.shutdown();
    sleep(Duration::from_millis(1)).await;
    assert!(matches!(
        fx.session.advance().await,
        Err(StoryError::SessionClosed)
    ));
}
