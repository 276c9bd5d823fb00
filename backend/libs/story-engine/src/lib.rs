//! # Story Engine
//!
//! Client-side engine for ephemeral stories: groups the story feed by author,
//! plays each group on a progress timer tied to every item's native duration,
//! records at-most-once views, and lists viewers for the author.
//!
//! ## Architecture
//!
//! ```text
//! StoryRecordStore ──▶ GroupingEngine ──▶ PlaybackMachine ──▶ ViewRecorder
//!   (Postgres /         (per-author,       (Closed/Playing/     (fire-and-forget,
//!    in-memory)          first-seen order)   Paused + timer)      idempotent)
//!         │
//!         └──────────────▶ ViewerAggregator (author only, newest first)
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use story_engine::{EngineConfig, InMemoryStoryStore, PlaybackSession};
//! use std::sync::Arc;
//!
//! # async fn example(viewer_id: uuid::Uuid, author_id: uuid::Uuid) -> story_engine::Result<()> {
//! let store = Arc::new(InMemoryStoryStore::new());
//! let session = PlaybackSession::spawn(EngineConfig::default(), store, Some(viewer_id));
//!
//! session.refresh(viewer_id).await?;
//! session.open_group(author_id, 0).await?;
//!
//! let mut snapshots = session.subscribe();
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow().clone();
//!     if snapshot.is_closed() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Degradation
//!
//! Failing view appends and viewer listings never interrupt playback; they
//! surface as `Notice`s on the session's notice channel.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod grouping;
pub mod metrics;
pub mod models;
pub mod playback;
pub mod recorder;
pub mod store;

pub use aggregator::{ViewerAggregator, ViewerListing};
pub use config::EngineConfig;
pub use error::{Result, StoryError};
pub use grouping::GroupingEngine;
pub use models::{
    AppendOutcome, AuthorSummary, ContentKind, GroupOwnership, Notice, StoryContent, StoryGroup,
    StoryItem, ViewRecord,
};
pub use playback::{PlaybackPhase, PlaybackSession, PlaybackSnapshot, SessionHandle};
pub use recorder::ViewRecorder;
pub use store::{InMemoryStoryStore, PgStoryStore, StoryRecordStore};
