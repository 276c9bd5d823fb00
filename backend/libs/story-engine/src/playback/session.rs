//! Playback session
//!
//! One session task owns the state machine, the grouping engine and the
//! progress timer. UI gestures arrive as commands and timer steps as ticks;
//! both are handled one at a time on the session task, so nothing mutates
//! playback state concurrently.
//!
//! ```text
//! SessionHandle ──commands──▶ session task ◀──ticks── ProgressTimer
//!                                  │
//!                    ┌─────────────┼──────────────┐
//!                    ▼             ▼              ▼
//!              watch snapshot  ViewRecorder   GroupingEngine
//! ```

use super::machine::{PlaybackMachine, Step};
use super::state::PlaybackSnapshot;
use super::timer::ProgressTimer;
use crate::config::EngineConfig;
use crate::error::{Result, StoryError};
use crate::grouping::GroupingEngine;
use crate::models::{Notice, StoryGroup, StoryItem};
use crate::recorder::ViewRecorder;
use crate::store::StoryRecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Advance,
    Retreat,
    Pause,
    Resume,
    Close,
}

enum Command {
    Open {
        author_id: Option<Uuid>,
        start_index: usize,
        reply: Reply<Result<PlaybackSnapshot>>,
    },
    Gesture {
        gesture: Gesture,
        reply: Reply<Result<PlaybackSnapshot>>,
    },
    MediaDuration {
        story_id: Uuid,
        duration: Duration,
    },
    AudioProgress {
        story_id: Uuid,
        current_time: Duration,
        duration: Option<Duration>,
    },
    AudioEnded {
        story_id: Uuid,
    },
    ReplaceItems {
        items: Vec<StoryItem>,
        reply: Reply<bool>,
    },
    SetViewer {
        viewer_id: Option<Uuid>,
        reply: Reply<bool>,
    },
    Groups {
        reply: Reply<Vec<StoryGroup>>,
    },
    SelfGroup {
        reply: Reply<Option<StoryGroup>>,
    },
    Shutdown,
}

/// Cloneable handle the UI shell drives the session through
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    notices: broadcast::Sender<Notice>,
    store: Arc<dyn StoryRecordStore>,
    feed_limit: i64,
}

impl SessionHandle {
    /// Open `author_id`'s group at `start_index` (0 for the first item)
    pub async fn open_group(&self, author_id: Uuid, start_index: usize) -> Result<PlaybackSnapshot> {
        self.request(|reply| Command::Open {
            author_id: Some(author_id),
            start_index,
            reply,
        })
        .await?
    }

    /// Open the viewer's own group. Fails with `EmptyGroup` when the viewer
    /// has no stories; the shell should offer story creation instead.
    pub async fn open_self_group(&self) -> Result<PlaybackSnapshot> {
        self.request(|reply| Command::Open {
            author_id: None,
            start_index: 0,
            reply,
        })
        .await?
    }

    pub async fn close_overlay(&self) -> Result<PlaybackSnapshot> {
        self.gesture(Gesture::Close).await
    }

    pub async fn advance(&self) -> Result<PlaybackSnapshot> {
        self.gesture(Gesture::Advance).await
    }

    pub async fn retreat(&self) -> Result<PlaybackSnapshot> {
        self.gesture(Gesture::Retreat).await
    }

    pub async fn pause(&self) -> Result<PlaybackSnapshot> {
        self.gesture(Gesture::Pause).await
    }

    pub async fn resume(&self) -> Result<PlaybackSnapshot> {
        self.gesture(Gesture::Resume).await
    }

    /// Native duration reported by the media element
    pub fn report_media_duration(&self, story_id: Uuid, duration: Duration) -> Result<()> {
        self.send(Command::MediaDuration { story_id, duration })
    }

    /// Audio element position update
    pub fn report_audio_progress(
        &self,
        story_id: Uuid,
        current_time: Duration,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.send(Command::AudioProgress {
            story_id,
            current_time,
            duration,
        })
    }

    /// Audio element reached its natural end
    pub fn audio_ended(&self, story_id: Uuid) -> Result<()> {
        self.send(Command::AudioEnded { story_id })
    }

    /// Reload the feed from the record store. On failure the shell gets a
    /// `StoriesUnavailable` notice and the previous groups stay in place.
    pub async fn refresh(&self, viewer_id: Uuid) -> Result<usize> {
        let items = match self
            .store
            .fetch_recent_stories(viewer_id, self.feed_limit)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(viewer_id = %viewer_id, error = %e, "Failed to load stories");
                let _ = self.notices.send(Notice::StoriesUnavailable);
                return Err(e);
            }
        };
        let count = items.len();
        self.set_viewer(Some(viewer_id)).await?;
        self.replace_items(items).await?;
        Ok(count)
    }

    /// Replace the source list; returns whether the groups changed
    pub async fn replace_items(&self, items: Vec<StoryItem>) -> Result<bool> {
        self.request(|reply| Command::ReplaceItems { items, reply })
            .await
    }

    /// Switch viewer identity; returns whether it changed
    pub async fn set_viewer(&self, viewer_id: Option<Uuid>) -> Result<bool> {
        self.request(|reply| Command::SetViewer { viewer_id, reply })
            .await
    }

    pub async fn groups(&self) -> Result<Vec<StoryGroup>> {
        self.request(|reply| Command::Groups { reply }).await
    }

    pub async fn self_group(&self) -> Result<Option<StoryGroup>> {
        self.request(|reply| Command::SelfGroup { reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Snapshot stream for renderers
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Stop the session task. Outstanding view appends keep running.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn gesture(&self, gesture: Gesture) -> Result<PlaybackSnapshot> {
        self.request(|reply| Command::Gesture { gesture, reply })
            .await?
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| StoryError::SessionClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply))?;
        response.await.map_err(|_| StoryError::SessionClosed)
    }
}

/// Session task state
pub struct PlaybackSession {
    machine: PlaybackMachine,
    grouping: GroupingEngine,
    recorder: ViewRecorder,
    timer: Option<ProgressTimer>,
    generation: u64,
    tick_tx: mpsc::UnboundedSender<u64>,
    snapshots: watch::Sender<PlaybackSnapshot>,
}

impl PlaybackSession {
    /// Spawn a session on the current runtime and return its handle
    pub fn spawn(
        config: EngineConfig,
        store: Arc<dyn StoryRecordStore>,
        viewer_id: Option<Uuid>,
    ) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::closed());
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));

        let session = PlaybackSession {
            machine: PlaybackMachine::new(config.clone()),
            grouping: GroupingEngine::new(viewer_id),
            recorder: ViewRecorder::new(store.clone(), notices.clone()),
            timer: None,
            generation: 0,
            tick_tx,
            snapshots: snapshot_tx,
        };
        tokio::spawn(session.run(commands_rx, tick_rx));

        SessionHandle {
            commands: commands_tx,
            snapshots: snapshot_rx,
            notices,
            store,
            feed_limit: config.feed_limit,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<u64>,
    ) {
        tracing::debug!("Playback session started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(generation) = ticks.recv() => self.on_tick(generation),
            }
        }
        let step = self.machine.close();
        self.apply(step);
        tracing::debug!("Playback session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Open {
                author_id,
                start_index,
                reply,
            } => {
                let result = self.open(author_id, start_index);
                let _ = reply.send(result);
            }
            Command::Gesture { gesture, reply } => {
                let result = self.gesture(gesture);
                let _ = reply.send(result);
            }
            Command::MediaDuration { story_id, duration } => {
                let step = self.machine.report_media_duration(story_id, duration);
                self.apply(step);
            }
            Command::AudioProgress {
                story_id,
                current_time,
                duration,
            } => {
                let step = self
                    .machine
                    .report_audio_progress(story_id, current_time, duration);
                self.apply(step);
            }
            Command::AudioEnded { story_id } => {
                let groups = self.grouping.groups();
                match self.machine.audio_ended(story_id, groups) {
                    Ok(step) => self.apply(step),
                    Err(e) => tracing::error!(story_id = %story_id, error = %e, "Audio end handling failed"),
                }
            }
            Command::ReplaceItems { items, reply } => {
                let _ = reply.send(self.grouping.replace_items(items));
            }
            Command::SetViewer { viewer_id, reply } => {
                let _ = reply.send(self.grouping.set_viewer(viewer_id));
            }
            Command::Groups { reply } => {
                let _ = reply.send(self.grouping.groups().to_vec());
            }
            Command::SelfGroup { reply } => {
                let _ = reply.send(self.grouping.self_group().cloned());
            }
            Command::Shutdown => {}
        }
    }

    fn open(&mut self, author_id: Option<Uuid>, start_index: usize) -> Result<PlaybackSnapshot> {
        let group = match author_id {
            Some(author_id) => self.grouping.group_for(author_id).cloned(),
            None => self.grouping.self_group().cloned(),
        };
        let step = match group {
            Some(group) => self.machine.open(&group, start_index),
            None => {
                let author_id = author_id.or(self.grouping.viewer_id()).unwrap_or_default();
                tracing::error!(author_id = %author_id, "Open requested for author without stories");
                Err(StoryError::EmptyGroup(author_id))
            }
        }?;
        self.apply(step);
        Ok(self.machine.snapshot())
    }

    fn gesture(&mut self, gesture: Gesture) -> Result<PlaybackSnapshot> {
        let groups = self.grouping.groups();
        let result = match gesture {
            Gesture::Advance => self.machine.advance(groups),
            Gesture::Retreat => self.machine.retreat(groups),
            Gesture::Pause => self.machine.pause(),
            Gesture::Resume => self.machine.resume(),
            Gesture::Close => Ok(self.machine.close()),
        };
        match result {
            Ok(step) => {
                self.apply(step);
                Ok(self.machine.snapshot())
            }
            Err(e) => {
                if e.is_contract_violation() {
                    tracing::error!(gesture = ?gesture, error = %e, "Playback contract violation");
                }
                Err(e)
            }
        }
    }

    fn on_tick(&mut self, generation: u64) {
        if generation != self.generation {
            tracing::trace!(generation, current = self.generation, "Dropping stale tick");
            return;
        }
        let groups = self.grouping.groups();
        match self.machine.tick(groups) {
            Ok(step) => self.apply(step),
            Err(e) => tracing::error!(error = %e, "Progress tick failed"),
        }
    }

    /// Run the effects of a transition and publish the new snapshot
    fn apply(&mut self, step: Step) {
        match &step {
            Step::Displayed(target) => {
                self.restart_timer();
                match self.grouping.viewer_id() {
                    Some(viewer_id) => {
                        // detached: closing the overlay does not cancel the append
                        drop(self.recorder.record_view(target.story_id, viewer_id));
                        self.grouping.mark_viewed(target.story_id, viewer_id);
                    }
                    None => tracing::debug!(
                        story_id = %target.story_id,
                        "No viewer identity, skipping view record"
                    ),
                }
            }
            Step::Resumed | Step::Retimed => self.restart_timer(),
            Step::Paused | Step::Closed => self.cancel_timer(),
            Step::Progressed | Step::Unchanged => {}
        }
        if step != Step::Unchanged {
            self.snapshots.send_replace(self.machine.snapshot());
        }
    }

    fn cancel_timer(&mut self) {
        // dropping aborts the task; bumping the generation discards queued ticks
        self.timer = None;
        self.generation += 1;
    }

    fn restart_timer(&mut self) {
        self.cancel_timer();
        if let Some(step) = self.machine.timer_interval() {
            self.timer = Some(ProgressTimer::start(
                step,
                self.generation,
                self.tick_tx.clone(),
            ));
        }
    }
}
