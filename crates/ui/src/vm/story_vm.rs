use std::collections::HashMap;
use std::time::Duration;

use listening_core::model::{
    AudioTrack, PlaybackStatus, QuestionConfig, SampleId, progress_percent, status_text,
};
use listening_core::story::{
    NavDirection, NavSource, PageChange, missing_alert_message, track_for_page,
};
use services::{NavOutcome, SampleSummary, StorySession, SubmitError, SubmitOutcome};

#[derive(Clone, Debug, PartialEq)]
pub enum StoryIntent {
    Navigate {
        direction: NavDirection,
        source: NavSource,
    },
    GoTo(usize),
    Rate {
        sample: SampleId,
        metric: String,
        value: i64,
    },
    /// Fired by a timer scheduled on `scheduled_page`.
    AutoAdvance { scheduled_page: usize },
    Replay(AudioTrack),
    DismissAlert,
}

/// Follow-up work the view performs after the VM changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoryEffect {
    None,
    Play { track: AudioTrack, delay: Duration },
    ScheduleAutoAdvance { page: usize, delay: Duration },
    Submit,
}

impl StoryEffect {
    fn from_page_change(change: PageChange) -> Self {
        match change.track {
            Some(track) => StoryEffect::Play {
                track,
                delay: change.playback_delay,
            },
            None => StoryEffect::None,
        }
    }
}

/// Playback state of one audio element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackPlayback {
    pub status: PlaybackStatus,
    pub percent: f64,
}

pub struct StoryVm {
    session: StorySession,
    alert: Option<String>,
    submitting: bool,
    playback: HashMap<String, TrackPlayback>,
}

impl StoryVm {
    #[must_use]
    pub fn new(session: StorySession) -> Self {
        Self {
            session,
            alert: None,
            submitting: false,
            playback: HashMap::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &StorySession {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &QuestionConfig {
        self.session.config()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.session.state().current_page()
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.session.state().total_pages()
    }

    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.session.state().is_last_page()
    }

    #[must_use]
    pub fn segments(&self) -> Vec<bool> {
        self.session.state().progress_segments()
    }

    /// Track belonging to the page on screen.
    #[must_use]
    pub fn current_track(&self) -> Option<AudioTrack> {
        track_for_page(self.config(), self.session.state().page())
    }

    #[must_use]
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    #[must_use]
    pub fn submitting(&self) -> bool {
        self.submitting
    }

    /// First-page playback, with the longer initial delay.
    #[must_use]
    pub fn initial_effect(&self) -> StoryEffect {
        StoryEffect::from_page_change(self.session.initial_page())
    }

    pub fn apply(&mut self, intent: StoryIntent) -> StoryEffect {
        match intent {
            StoryIntent::Navigate { direction, source } => self.navigate(direction, source),
            StoryIntent::GoTo(index) => self
                .session
                .go_to_page(index)
                .map_or(StoryEffect::None, StoryEffect::from_page_change),
            StoryIntent::Rate {
                sample,
                metric,
                value,
            } => self.rate(&sample, &metric, value),
            StoryIntent::AutoAdvance { scheduled_page } => {
                if self.alert.is_some() || !self.session.should_auto_advance(scheduled_page) {
                    return StoryEffect::None;
                }
                self.navigate(NavDirection::Forward, NavSource::AutoAdvance)
            }
            StoryIntent::Replay(track) => StoryEffect::Play {
                track,
                delay: Duration::ZERO,
            },
            StoryIntent::DismissAlert => {
                self.alert = None;
                StoryEffect::None
            }
        }
    }

    fn navigate(&mut self, direction: NavDirection, source: NavSource) -> StoryEffect {
        if self.submitting {
            return StoryEffect::None;
        }
        match self.session.navigate(direction, source) {
            NavOutcome::Moved(change) => StoryEffect::from_page_change(change),
            NavOutcome::Blocked(missing) => {
                self.alert = Some(missing_alert_message(std::slice::from_ref(&missing)));
                StoryEffect::None
            }
            NavOutcome::Submit => StoryEffect::Submit,
            NavOutcome::Ignored => StoryEffect::None,
        }
    }

    fn rate(&mut self, sample: &SampleId, metric: &str, value: i64) -> StoryEffect {
        match self.session.rate(sample, metric, value) {
            Ok(outcome) => outcome
                .auto_advance_after
                .map_or(StoryEffect::None, |delay| StoryEffect::ScheduleAutoAdvance {
                    page: self.current_page(),
                    delay,
                }),
            Err(err) => {
                log::warn!("ignored rating {sample}/{metric}={value}: {err}");
                StoryEffect::None
            }
        }
    }

    #[must_use]
    pub fn selected(&self, sample: &SampleId, metric: &str) -> Option<i64> {
        self.session.rating(sample, metric)
    }

    /// Whether the forward zone should look clickable.
    #[must_use]
    pub fn forward_enabled(&self) -> bool {
        self.session.debug() || self.session.current_page_complete()
    }

    #[must_use]
    pub fn summary(&self) -> Vec<SampleSummary> {
        self.session.summary()
    }

    /// Mark a submit as started. Returns false if one is already running.
    pub fn begin_submit(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        true
    }

    pub fn finish_submit(&mut self, result: &Result<SubmitOutcome, SubmitError>) {
        self.submitting = false;
        if let Err(err) = result {
            self.alert = Some(err.user_message());
        }
    }

    #[must_use]
    pub fn playback(&self, track: &AudioTrack) -> TrackPlayback {
        self.playback
            .get(&track.element_key())
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn status_line(&self, track: &AudioTrack) -> String {
        status_text(track, self.playback(track).status)
    }

    pub fn set_status(&mut self, track: &AudioTrack, status: PlaybackStatus) {
        let entry = self.playback.entry(track.element_key()).or_default();
        entry.status = status;
        if status == PlaybackStatus::Ended {
            entry.percent = 100.0;
        }
    }

    pub fn set_progress(&mut self, track: &AudioTrack, current_time: f64, duration: f64) {
        self.playback.entry(track.element_key()).or_default().percent =
            progress_percent(current_time, duration);
    }
}
