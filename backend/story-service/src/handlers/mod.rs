/// HTTP handlers for story endpoints
///
/// - Stories: grouped feed, creation, view tracking, viewer list
/// - Health: liveness and database health
pub mod health;
pub mod stories;

pub use health::{health_summary, liveness_check};
pub use stories::{
    create_story, list_story_groups, list_story_viewers, record_story_view, StoryHandlerState,
};
