/// Playback state machine
///
/// States: Closed, Playing(group, index), Paused(group, index, saved progress).
/// Every method is synchronous and side-effect free apart from the state
/// itself; the returned `Step` tells the session which effects to run
/// (restart or cancel the progress timer, record a view).
use super::state::{PlaybackPhase, PlaybackSnapshot, PlaybackState};
use crate::config::EngineConfig;
use crate::error::{Result, StoryError};
use crate::metrics;
use crate::models::{ProgressSource, StoryGroup};
use std::time::Duration;
use uuid::Uuid;

const FULL_PROGRESS: f64 = 100.0;

/// The item that just became the display target
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTarget {
    pub story_id: Uuid,
    pub author_id: Uuid,
    pub index: usize,
    pub progress_source: ProgressSource,
}

/// Effect required after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// New item on screen: record a view and restart progress
    Displayed(DisplayTarget),
    /// Progress moved on the same item
    Progressed,
    /// Timer must be cancelled, progress saved
    Paused,
    /// Timer must be recreated from the saved progress
    Resumed,
    /// Target duration changed mid-item; recreate the timer keeping progress
    Retimed,
    /// Overlay closed; timer must be cancelled
    Closed,
    Unchanged,
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Step::Displayed(_) => "display",
            Step::Progressed => "progress",
            Step::Paused => "pause",
            Step::Resumed => "resume",
            Step::Retimed => "retime",
            Step::Closed => "close",
            Step::Unchanged => "unchanged",
        }
    }
}

pub struct PlaybackMachine {
    state: PlaybackState,
    config: EngineConfig,
}

impl PlaybackMachine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: PlaybackState::closed(config.default_item_duration),
            config,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot()
    }

    /// Tick interval for the active item, `None` when no timer should run
    /// (closed, paused, or an item whose progress follows the audio clock)
    pub fn timer_interval(&self) -> Option<Duration> {
        if self.state.phase() != PlaybackPhase::Playing {
            return None;
        }
        let item = self.state.current_item()?;
        match item.content.progress_source() {
            ProgressSource::PlaybackPosition => None,
            ProgressSource::Countdown | ProgressSource::ReportedCountdown => {
                Some(self.config.step_interval(self.state.target_duration))
            }
        }
    }

    /// Closed -> Playing(group, start_index). A start index past the end is
    /// clamped to the last item.
    pub fn open(&mut self, group: &StoryGroup, start_index: usize) -> Result<Step> {
        let Some(last_index) = group.last_index() else {
            tracing::error!(author_id = %group.author_id, "Refusing to open empty story group");
            return Err(StoryError::EmptyGroup(group.author_id));
        };
        if start_index > last_index {
            tracing::warn!(
                author_id = %group.author_id,
                start_index,
                last_index,
                "Start index out of range, clamping"
            );
        }

        self.state = PlaybackState::closed(self.config.default_item_duration);
        self.state.active_group = Some(group.clone());
        self.state.index = start_index.min(last_index);
        Ok(counted(self.display_current()))
    }

    /// Next item, else first item of the next group, else Closed
    pub fn advance(&mut self, groups: &[StoryGroup]) -> Result<Step> {
        let (author_id, len) = self.active("advance")?;
        if self.state.index + 1 < len {
            self.state.index += 1;
            return Ok(counted(self.display_current()));
        }

        let next = groups
            .iter()
            .position(|g| g.author_id == author_id)
            .and_then(|p| groups.get(p + 1))
            .filter(|g| !g.is_empty());
        match next {
            Some(next) => self.open(next, 0),
            None => Ok(self.close()),
        }
    }

    /// Previous item, else last item of the previous group, else no-op
    pub fn retreat(&mut self, groups: &[StoryGroup]) -> Result<Step> {
        let (author_id, _) = self.active("retreat")?;
        if self.state.index > 0 {
            self.state.index -= 1;
            return Ok(counted(self.display_current()));
        }

        let previous = groups
            .iter()
            .position(|g| g.author_id == author_id)
            .and_then(|p| p.checked_sub(1))
            .and_then(|p| groups.get(p));
        match previous.and_then(|g| g.last_index().map(|last| (g, last))) {
            Some((group, last)) => self.open(group, last),
            None => Ok(Step::Unchanged),
        }
    }

    pub fn pause(&mut self) -> Result<Step> {
        self.active("pause")?;
        if self.state.paused {
            return Ok(Step::Unchanged);
        }
        self.state.saved_progress_percent = self.state.progress_percent;
        self.state.paused = true;
        Ok(counted(Step::Paused))
    }

    pub fn resume(&mut self) -> Result<Step> {
        self.active("resume")?;
        if !self.state.paused {
            return Ok(Step::Unchanged);
        }
        self.state.progress_percent = self.state.saved_progress_percent;
        self.state.paused = false;
        Ok(counted(Step::Resumed))
    }

    /// Any state -> Closed
    pub fn close(&mut self) -> Step {
        self.state = PlaybackState::closed(self.config.default_item_duration);
        counted(Step::Closed)
    }

    /// One timer step. Stale ticks (closed, paused, audio items) are ignored.
    pub fn tick(&mut self, groups: &[StoryGroup]) -> Result<Step> {
        if self.timer_interval().is_none() {
            return Ok(Step::Unchanged);
        }
        let increment = FULL_PROGRESS / f64::from(self.config.progress_steps.max(1));
        self.state.progress_percent = (self.state.progress_percent + increment).min(FULL_PROGRESS);
        if self.state.progress_percent >= FULL_PROGRESS {
            return self.advance(groups);
        }
        Ok(Step::Progressed)
    }

    /// Native duration reported by the video/audio element for `story_id`
    pub fn report_media_duration(&mut self, story_id: Uuid, duration: Duration) -> Step {
        let Some(source) = self.current_source(story_id) else {
            return Step::Unchanged;
        };
        if source == ProgressSource::Countdown || duration.is_zero() {
            return Step::Unchanged;
        }
        if self.state.duration_reported && self.state.target_duration == duration {
            return Step::Unchanged;
        }

        tracing::debug!(
            story_id = %story_id,
            duration_ms = duration.as_millis() as u64,
            "Media duration reported"
        );
        self.state.target_duration = duration;
        self.state.duration_reported = true;
        match source {
            ProgressSource::ReportedCountdown => counted(Step::Retimed),
            _ => Step::Progressed,
        }
    }

    /// Audio playback position; progress follows the audio clock directly
    pub fn report_audio_progress(
        &mut self,
        story_id: Uuid,
        current_time: Duration,
        duration: Option<Duration>,
    ) -> Step {
        if self.current_source(story_id) != Some(ProgressSource::PlaybackPosition)
            || self.state.paused
        {
            return Step::Unchanged;
        }
        if let Some(duration) = duration.filter(|d| !d.is_zero()) {
            self.state.target_duration = duration;
            self.state.duration_reported = true;
        }

        let percent = current_time.as_secs_f64() / self.state.target_duration.as_secs_f64()
            * FULL_PROGRESS;
        self.state.progress_percent = percent.clamp(0.0, FULL_PROGRESS);
        Step::Progressed
    }

    /// Natural end of audio playback for `story_id`
    pub fn audio_ended(&mut self, story_id: Uuid, groups: &[StoryGroup]) -> Result<Step> {
        if self.current_source(story_id) != Some(ProgressSource::PlaybackPosition) {
            return Ok(Step::Unchanged);
        }
        self.state.progress_percent = FULL_PROGRESS;
        self.advance(groups)
    }

    fn current_source(&self, story_id: Uuid) -> Option<ProgressSource> {
        self.state
            .current_item()
            .filter(|item| item.id == story_id)
            .map(|item| item.content.progress_source())
    }

    fn active(&self, operation: &str) -> Result<(Uuid, usize)> {
        self.state
            .active_group
            .as_ref()
            .map(|group| (group.author_id, group.items.len()))
            .ok_or_else(|| {
                StoryError::InvalidGroupReference(format!("{} requested with no active group", operation))
            })
    }

    /// Reset per-item progress for `state.index` and describe the new target
    fn display_current(&mut self) -> Step {
        self.state.progress_percent = 0.0;
        self.state.saved_progress_percent = 0.0;
        self.state.paused = false;
        self.state.target_duration = self.config.default_item_duration;
        self.state.duration_reported = false;

        match (&self.state.active_group, self.state.current_item()) {
            (Some(group), Some(item)) => Step::Displayed(DisplayTarget {
                story_id: item.id,
                author_id: group.author_id,
                index: self.state.index,
                progress_source: item.content.progress_source(),
            }),
            _ => Step::Unchanged,
        }
    }
}

fn counted(step: Step) -> Step {
    metrics::record_transition(step.label());
    step
}
