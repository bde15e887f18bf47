//! Page/rating state machine for one question.
//!
//! Pages are laid out as `[prompt, sample 1, sample 2, ...]`. Everything here is
//! pure so the rules can be exercised without a UI.

use std::time::Duration;

use crate::model::{AnswerMap, AudioTrack, QuestionConfig, SampleId};

/// Delay between a page change and playback of that page's audio.
pub const PAGE_PLAYBACK_DELAY: Duration = Duration::from_millis(300);
/// Delay before the first page's audio plays after load.
pub const INITIAL_PLAYBACK_DELAY: Duration = Duration::from_millis(500);
/// Delay between completing a sample and advancing automatically.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(1000);
/// Minimum horizontal travel for a touch gesture to count as a swipe.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

//
// ─── PAGES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Prompt,
    /// Zero-based sample index.
    Sample(usize),
}

impl Page {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Page::Prompt,
            n => Page::Sample(n - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Back,
}

/// What triggered a navigation request. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSource {
    Click,
    Button,
    Keyboard,
    Swipe,
    AutoAdvance,
}

/// Current position in the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryState {
    current_page: usize,
    total_pages: usize,
}

impl StoryState {
    /// A story with `total_pages` pages (at least one), starting on the first.
    #[must_use]
    pub fn new(total_pages: usize) -> Self {
        Self {
            current_page: 0,
            total_pages: total_pages.max(1),
        }
    }

    #[must_use]
    pub fn for_question(config: &QuestionConfig) -> Self {
        Self::new(config.total_pages())
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    #[must_use]
    pub fn page(&self) -> Page {
        Page::from_index(self.current_page)
    }

    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.current_page + 1 == self.total_pages
    }

    /// Move to `index`. Out-of-range indices leave the state untouched.
    ///
    /// Returns whether the move happened.
    pub fn go_to_page(&mut self, index: usize) -> bool {
        if index >= self.total_pages {
            return false;
        }
        self.current_page = index;
        true
    }

    /// Signed variant of [`Self::go_to_page`] for callers computing `current - 1`.
    pub fn go_to_offset(&mut self, index: isize) -> bool {
        usize::try_from(index).is_ok_and(|index| self.go_to_page(index))
    }

    /// One flag per progress segment; segments up to the current page are active.
    #[must_use]
    pub fn progress_segments(&self) -> Vec<bool> {
        (0..self.total_pages)
            .map(|i| i <= self.current_page)
            .collect()
    }
}

/// Everything the view needs after landing on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChange {
    pub page: usize,
    pub segments: Vec<bool>,
    pub track: Option<AudioTrack>,
    pub playback_delay: Duration,
}

impl PageChange {
    /// Describe the state's current page. `initial` selects the longer first-load delay.
    #[must_use]
    pub fn describe(state: &StoryState, config: &QuestionConfig, initial: bool) -> Self {
        Self {
            page: state.current_page(),
            segments: state.progress_segments(),
            track: track_for_page(config, state.page()),
            playback_delay: if initial {
                INITIAL_PLAYBACK_DELAY
            } else {
                PAGE_PLAYBACK_DELAY
            },
        }
    }
}

//
// ─── VALIDATION ────────────────────────────────────────────────────────────────
//

/// Unrated metrics for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRatings {
    pub sample: SampleId,
    /// One-based position shown to the participant ("Sample 2").
    pub sample_number: usize,
    pub metrics: Vec<String>,
}

impl MissingRatings {
    #[must_use]
    pub fn label(&self) -> String {
        format!("Sample {}", self.sample_number)
    }
}

/// Missing ratings for the sample shown on `page`, if any.
#[must_use]
pub fn missing_for_page(
    page: Page,
    config: &QuestionConfig,
    answers: &AnswerMap,
) -> Option<MissingRatings> {
    let Page::Sample(index) = page else {
        return None;
    };
    let sample = config.samples.get(index)?;
    let metrics = answers.missing_metrics(sample, &config.metrics);
    (!metrics.is_empty()).then(|| MissingRatings {
        sample: sample.clone(),
        sample_number: index + 1,
        metrics,
    })
}

/// Missing ratings across every sample of the question.
#[must_use]
pub fn all_missing(config: &QuestionConfig, answers: &AnswerMap) -> Vec<MissingRatings> {
    (0..config.samples.len())
        .filter_map(|index| missing_for_page(Page::Sample(index), config, answers))
        .collect()
}

/// Text for the blocking alert raised by incomplete ratings.
#[must_use]
pub fn missing_alert_message(missing: &[MissingRatings]) -> String {
    match missing {
        [] => String::new(),
        [single] => format!(
            "Please rate all metrics before continuing.\nMissing: {}",
            single.metrics.join(", ")
        ),
        many => {
            let lines = many
                .iter()
                .map(|m| format!("{}: {}", m.label(), m.metrics.join(", ")))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Please rate all samples before submitting.\n{lines}")
        }
    }
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Outcome of a navigation request, decided before any state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavDecision {
    /// Move to the given page.
    Move(usize),
    /// Forward navigation refused until these ratings exist.
    Blocked(MissingRatings),
    /// Forward from the final page: save and advance instead.
    Submit,
    /// Nothing to do (e.g. back from the first page).
    Ignore,
}

/// Decide what a navigation request should do.
///
/// Forward moves off a sample page are gated on that sample's ratings unless
/// `debug` is set.
#[must_use]
pub fn decide_navigation(
    state: &StoryState,
    direction: NavDirection,
    config: &QuestionConfig,
    answers: &AnswerMap,
    debug: bool,
) -> NavDecision {
    match direction {
        NavDirection::Back => match state.current_page().checked_sub(1) {
            Some(prev) => NavDecision::Move(prev),
            None => NavDecision::Ignore,
        },
        NavDirection::Forward => {
            if !debug {
                if let Some(missing) = missing_for_page(state.page(), config, answers) {
                    return NavDecision::Blocked(missing);
                }
            }
            if state.is_last_page() {
                NavDecision::Submit
            } else {
                NavDecision::Move(state.current_page() + 1)
            }
        }
    }
}

/// Classify a touch gesture by its horizontal start/end positions.
///
/// Finger travelling left means "next", travelling right means "previous".
#[must_use]
pub fn swipe_direction(start_x: f64, end_x: f64) -> Option<NavDirection> {
    if end_x < start_x - SWIPE_THRESHOLD_PX {
        Some(NavDirection::Forward)
    } else if end_x > start_x + SWIPE_THRESHOLD_PX {
        Some(NavDirection::Back)
    } else {
        None
    }
}

/// The audio track played on `page`.
#[must_use]
pub fn track_for_page(config: &QuestionConfig, page: Page) -> Option<AudioTrack> {
    match page {
        Page::Prompt => Some(AudioTrack::Prompt),
        Page::Sample(index) => config.samples.get(index).map(|id| AudioTrack::Sample {
            index,
            id: id.clone(),
        }),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metric, PromptId, QuestionId};

    fn config(samples: &[&str], metrics: &[&str]) -> QuestionConfig {
        QuestionConfig {
            question_id: QuestionId::new("q1"),
            question_index: Some(0),
            prompt_id: PromptId::new("001"),
            samples: samples.iter().map(|s| SampleId::new(*s)).collect(),
            metrics: metrics.iter().map(|m| Metric::new(*m)).collect(),
            is_last: false,
            next_url: None,
            prev_url: None,
            audio_root: "static/audio".into(),
            debug: false,
            samples_defaulted: false,
        }
    }

    #[test]
    fn out_of_range_pages_leave_state_unchanged() {
        let mut state = StoryState::new(4);
        assert!(state.go_to_page(2));
        let before = state;

        for index in [4, 5, 100, usize::MAX] {
            assert!(!state.go_to_page(index));
            assert_eq!(state, before);
        }
        assert!(!state.go_to_offset(-1));
        assert_eq!(state, before);
    }

    #[test]
    fn progress_marks_segments_up_to_current() {
        let mut state = StoryState::new(4);
        assert_eq!(state.progress_segments(), vec![true, false, false, false]);
        state.go_to_page(2);
        assert_eq!(state.progress_segments(), vec![true, true, true, false]);
    }

    #[test]
    fn forward_blocked_lists_missing_metric() {
        let config = config(&["gt", "methodA"], &["naturalness", "consistency", "quality"]);
        let mut state = StoryState::for_question(&config);
        state.go_to_page(2);

        let mut answers = AnswerMap::new();
        let sample = SampleId::new("methodA");
        answers.set(&sample, "naturalness", 4);
        answers.set(&sample, "quality", 3);

        let decision =
            decide_navigation(&state, NavDirection::Forward, &config, &answers, false);
        let NavDecision::Blocked(missing) = decision else {
            panic!("expected blocked, got {decision:?}");
        };
        assert_eq!(missing.sample, sample);
        assert_eq!(missing.metrics, vec!["consistency".to_string()]);
        assert_eq!(missing.label(), "Sample 2");
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn debug_mode_bypasses_gate() {
        let config = config(&["gt", "methodA"], &["quality"]);
        let mut state = StoryState::for_question(&config);
        state.go_to_page(1);
        let answers = AnswerMap::new();

        assert!(matches!(
            decide_navigation(&state, NavDirection::Forward, &config, &answers, false),
            NavDecision::Blocked(_)
        ));
        assert_eq!(
            decide_navigation(&state, NavDirection::Forward, &config, &answers, true),
            NavDecision::Move(2)
        );
    }

    #[test]
    fn prompt_page_is_never_gated() {
        let config = config(&["gt"], &["quality"]);
        let state = StoryState::for_question(&config);
        assert_eq!(
            decide_navigation(&state, NavDirection::Forward, &config, &AnswerMap::new(), false),
            NavDecision::Move(1)
        );
    }

    #[test]
    fn forward_on_last_page_submits_and_back_on_first_is_ignored() {
        let config = config(&["gt"], &["quality"]);
        let mut state = StoryState::for_question(&config);
        assert_eq!(
            decide_navigation(&state, NavDirection::Back, &config, &AnswerMap::new(), false),
            NavDecision::Ignore
        );

        state.go_to_page(1);
        let mut answers = AnswerMap::new();
        answers.set(&SampleId::new("gt"), "quality", 5);
        assert_eq!(
            decide_navigation(&state, NavDirection::Forward, &config, &answers, false),
            NavDecision::Submit
        );
        assert_eq!(
            decide_navigation(&state, NavDirection::Back, &config, &answers, false),
            NavDecision::Move(0)
        );
    }

    #[test]
    fn swipe_needs_threshold() {
        assert_eq!(swipe_direction(200.0, 100.0), Some(NavDirection::Forward));
        assert_eq!(swipe_direction(100.0, 200.0), Some(NavDirection::Back));
        assert_eq!(swipe_direction(100.0, 140.0), None);
        assert_eq!(swipe_direction(100.0, 50.0), None);
    }

    #[test]
    fn alert_message_lists_per_sample_when_many() {
        let config = config(&["gt", "methodA"], &["quality", "consistency"]);
        let mut answers = AnswerMap::new();
        answers.set(&SampleId::new("gt"), "quality", 5);
        let missing = all_missing(&config, &answers);
        assert_eq!(missing.len(), 2);

        let message = missing_alert_message(&missing);
        assert!(message.contains("Sample 1: consistency"));
        assert!(message.contains("Sample 2: quality, consistency"));

        let single = missing_alert_message(&missing[..1]);
        assert!(single.ends_with("Missing: consistency"));
    }

    #[test]
    fn page_change_carries_delay_and_track() {
        let config = config(&["gt", "methodA"], &[]);
        let mut state = StoryState::for_question(&config);
        let initial = PageChange::describe(&state, &config, true);
        assert_eq!(initial.playback_delay, INITIAL_PLAYBACK_DELAY);
        assert_eq!(initial.track, Some(AudioTrack::Prompt));

        state.go_to_page(1);
        let change = PageChange::describe(&state, &config, false);
        assert_eq!(change.page, 1);
        assert_eq!(change.segments, vec![true, true, false]);
        assert_eq!(change.playback_delay, PAGE_PLAYBACK_DELAY);
        assert_eq!(change.track.map(|t| t.tag().to_string()), Some("gt".to_string()));
    }

    #[test]
    fn tracks_follow_pages() {
        let config = config(&["gt", "methodA"], &[]);
        assert_eq!(track_for_page(&config, Page::Prompt), Some(AudioTrack::Prompt));
        assert_eq!(
            track_for_page(&config, Page::Sample(1)),
            Some(AudioTrack::Sample {
                index: 1,
                id: SampleId::new("methodA")
            })
        );
        assert_eq!(track_for_page(&config, Page::Sample(5)), None);
    }
}
