/// Grouping engine
///
/// Partitions the freshness-ordered story feed into per-author groups:
/// - groups appear in the order their author first shows up in the feed
/// - items inside a group play oldest first
/// - items without a resolvable author are dropped
///
/// `GroupingEngine` caches the result and only rebuilds when the source list
/// or the viewer identity actually changed (tracked by a version counter).
use crate::metrics;
use crate::models::{AuthorSummary, GroupOwnership, StoryGroup, StoryItem};
use std::collections::HashMap;
use uuid::Uuid;

/// Build the ordered author groups for `viewer_id`
pub fn build_groups(items: &[StoryItem], viewer_id: Option<Uuid>) -> Vec<StoryGroup> {
    let mut groups: Vec<StoryGroup> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for item in items {
        let Some(author) = item.author.as_ref() else {
            continue;
        };
        let position = *positions.entry(item.author_id).or_insert_with(|| {
            groups.push(StoryGroup {
                author_id: item.author_id,
                author: author.clone(),
                ownership: ownership_of(item.author_id, viewer_id),
                items: Vec::new(),
                fully_viewed: false,
            });
            groups.len() - 1
        });
        groups[position].items.push(item.clone());
    }

    for group in &mut groups {
        finish_group(group, viewer_id);
    }
    groups
}

/// Build the viewer's own group. Unlike `build_groups` this filters on the
/// author id alone, so it is produced even when the viewer's profile is
/// missing, and it may be empty.
pub fn build_self_group(items: &[StoryItem], viewer_id: Uuid) -> StoryGroup {
    let own: Vec<StoryItem> = items
        .iter()
        .filter(|item| item.author_id == viewer_id)
        .cloned()
        .collect();
    let author = own
        .iter()
        .find_map(|item| item.author.clone())
        .unwrap_or_else(|| AuthorSummary::unresolved(viewer_id));

    let mut group = StoryGroup {
        author_id: viewer_id,
        author,
        ownership: GroupOwnership::Own,
        items: own,
        fully_viewed: false,
    };
    finish_group(&mut group, Some(viewer_id));
    group
}

/// True iff every item in `items` was viewed by `viewer_id`
pub fn is_fully_viewed(items: &[StoryItem], viewer_id: Option<Uuid>) -> bool {
    match viewer_id {
        Some(viewer_id) => items.iter().all(|item| item.is_viewed_by(viewer_id)),
        None => false,
    }
}

fn finish_group(group: &mut StoryGroup, viewer_id: Option<Uuid>) {
    // stable: equal timestamps keep feed order
    group.items.sort_by_key(|item| item.created_at);
    group.fully_viewed = is_fully_viewed(&group.items, viewer_id);
}

fn ownership_of(author_id: Uuid, viewer_id: Option<Uuid>) -> GroupOwnership {
    if viewer_id == Some(author_id) {
        GroupOwnership::Own
    } else {
        GroupOwnership::Other
    }
}

struct GroupCache {
    version: u64,
    groups: Vec<StoryGroup>,
    self_group: Option<StoryGroup>,
}

/// Incrementally maintained grouping over a source list and viewer identity
pub struct GroupingEngine {
    items: Vec<StoryItem>,
    viewer_id: Option<Uuid>,
    version: u64,
    cache: Option<GroupCache>,
}

impl GroupingEngine {
    pub fn new(viewer_id: Option<Uuid>) -> Self {
        Self {
            items: Vec::new(),
            viewer_id,
            version: 0,
            cache: None,
        }
    }

    pub fn viewer_id(&self) -> Option<Uuid> {
        self.viewer_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[StoryItem] {
        &self.items
    }

    /// Replace the source list. Returns whether anything changed.
    pub fn replace_items(&mut self, items: Vec<StoryItem>) -> bool {
        if self.items == items {
            return false;
        }
        self.items = items;
        self.version += 1;
        true
    }

    /// Switch viewer identity. Returns whether anything changed.
    pub fn set_viewer(&mut self, viewer_id: Option<Uuid>) -> bool {
        if self.viewer_id == viewer_id {
            return false;
        }
        self.viewer_id = viewer_id;
        self.version += 1;
        true
    }

    /// Add `viewer_id` to the item's viewer set. Returns whether the set grew.
    pub fn mark_viewed(&mut self, story_id: Uuid, viewer_id: Uuid) -> bool {
        let grew = self
            .items
            .iter_mut()
            .find(|item| item.id == story_id)
            .map(|item| item.viewer_ids.insert(viewer_id))
            .unwrap_or(false);
        if grew {
            self.version += 1;
        }
        grew
    }

    pub fn groups(&mut self) -> &[StoryGroup] {
        &self.refresh().groups
    }

    /// The viewer's own group; `None` when there is no viewer identity
    pub fn self_group(&mut self) -> Option<&StoryGroup> {
        self.refresh().self_group.as_ref()
    }

    pub fn group_for(&mut self, author_id: Uuid) -> Option<&StoryGroup> {
        self.groups()
            .iter()
            .find(|group| group.author_id == author_id)
    }

    /// Group following `author_id` in feed order
    pub fn next_group_after(&mut self, author_id: Uuid) -> Option<&StoryGroup> {
        let groups = self.groups();
        let position = groups.iter().position(|g| g.author_id == author_id)?;
        groups.get(position + 1)
    }

    /// Group preceding `author_id` in feed order
    pub fn previous_group_before(&mut self, author_id: Uuid) -> Option<&StoryGroup> {
        let groups = self.groups();
        let position = groups.iter().position(|g| g.author_id == author_id)?;
        position.checked_sub(1).and_then(|p| groups.get(p))
    }

    fn refresh(&mut self) -> &GroupCache {
        let stale = self
            .cache
            .as_ref()
            .map_or(true, |cache| cache.version != self.version);
        if stale {
            metrics::record_grouping_rebuild();
            tracing::debug!(
                version = self.version,
                items = self.items.len(),
                "Rebuilding story groups"
            );
            self.cache = Some(GroupCache {
                version: self.version,
                groups: build_groups(&self.items, self.viewer_id),
                self_group: self
                    .viewer_id
                    .map(|viewer_id| build_self_group(&self.items, viewer_id)),
            });
        }
        self.cache.get_or_insert_with(|| GroupCache {
            version: self.version,
            groups: Vec::new(),
            self_group: None,
        })
    }
}
