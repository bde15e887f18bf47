use std::time::Duration;

use listening_core::model::{AnswerLayout, AnswerMap, QuestionConfig, RatingError, SampleId};
use listening_core::story::{
    AUTO_ADVANCE_DELAY, MissingRatings, NavDecision, NavDirection, NavSource, Page, PageChange,
    StoryState, all_missing, decide_navigation,
};
use listening_core::{Clock, QuestionTimer};

use crate::api::SaveRequest;

/// Behaviour switches for a story session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryOptions {
    /// Move on automatically once the current sample is fully rated.
    pub auto_advance: bool,
    pub answer_layout: AnswerLayout,
    /// Treat every question as if it carried `data-debug-mode="true"`.
    pub force_debug: bool,
}

impl Default for StoryOptions {
    fn default() -> Self {
        Self {
            auto_advance: true,
            answer_layout: AnswerLayout::Flat,
            force_debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Moved(PageChange),
    Blocked(MissingRatings),
    /// Forward from the final page; run the submit workflow.
    Submit,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateOutcome {
    pub sample_complete: bool,
    /// Set when the caller should schedule a forward move after this delay.
    pub auto_advance_after: Option<Duration>,
    pub previous: Option<i64>,
}

/// One line of the end-of-question ratings summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSummary {
    pub label: String,
    pub sample: SampleId,
    pub ratings: Vec<(String, i64)>,
}

/// Page state, answers and timing for the question on screen.
#[derive(Debug, Clone)]
pub struct StorySession {
    config: QuestionConfig,
    options: StoryOptions,
    state: StoryState,
    answers: AnswerMap,
    timer: QuestionTimer,
    clock: Clock,
}

impl StorySession {
    #[must_use]
    pub fn new(config: QuestionConfig, options: StoryOptions, clock: Clock) -> Self {
        let state = StoryState::for_question(&config);
        log::debug!(
            "story for question {} with {} pages",
            config.question_id,
            state.total_pages()
        );
        Self {
            config,
            options,
            state,
            answers: AnswerMap::new(),
            timer: QuestionTimer::start(&clock),
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &QuestionConfig {
        &self.config
    }

    #[must_use]
    pub fn options(&self) -> StoryOptions {
        self.options
    }

    #[must_use]
    pub fn state(&self) -> &StoryState {
        &self.state
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.config.debug || self.options.force_debug
    }

    /// Page change describing the first page, with the initial playback delay.
    #[must_use]
    pub fn initial_page(&self) -> PageChange {
        PageChange::describe(&self.state, &self.config, true)
    }

    /// Jump straight to `index`, bypassing validation. Out of range does nothing.
    pub fn go_to_page(&mut self, index: usize) -> Option<PageChange> {
        if !self.state.go_to_page(index) {
            return None;
        }
        log::debug!("page -> {index}");
        Some(PageChange::describe(&self.state, &self.config, false))
    }

    pub fn navigate(&mut self, direction: NavDirection, source: NavSource) -> NavOutcome {
        let decision = decide_navigation(
            &self.state,
            direction,
            &self.config,
            &self.answers,
            self.debug(),
        );
        log::debug!("{source:?} {direction:?} on page {}: {decision:?}", self.state.current_page());
        match decision {
            NavDecision::Move(index) => self
                .go_to_page(index)
                .map_or(NavOutcome::Ignored, NavOutcome::Moved),
            NavDecision::Blocked(missing) => NavOutcome::Blocked(missing),
            NavDecision::Submit => NavOutcome::Submit,
            NavDecision::Ignore => NavOutcome::Ignored,
        }
    }

    /// Whether an auto-advance scheduled on `scheduled_page` should still fire.
    #[must_use]
    pub fn should_auto_advance(&self, scheduled_page: usize) -> bool {
        self.state.current_page() == scheduled_page
    }

    /// Record a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` for an unknown sample or metric, or a value outside
    /// the metric's scale.
    pub fn rate(
        &mut self,
        sample: &SampleId,
        metric: &str,
        value: i64,
    ) -> Result<RateOutcome, RatingError> {
        let index = self
            .config
            .sample_index(sample)
            .ok_or_else(|| RatingError::UnknownSample(sample.to_string()))?;
        self.config
            .metric(metric)
            .ok_or_else(|| RatingError::UnknownMetric(metric.to_string()))?
            .check(value)?;

        let was_complete = self.is_sample_complete(sample);
        let previous = self.answers.set(sample, metric, value);
        let sample_complete = self.is_sample_complete(sample);

        let on_current_page = self.state.page() == Page::Sample(index);
        let auto_advance_after = (self.options.auto_advance
            && sample_complete
            && !was_complete
            && on_current_page
            && !self.state.is_last_page())
        .then_some(AUTO_ADVANCE_DELAY);

        Ok(RateOutcome {
            sample_complete,
            auto_advance_after,
            previous,
        })
    }

    #[must_use]
    pub fn rating(&self, sample: &SampleId, metric: &str) -> Option<i64> {
        self.answers.get(sample, metric)
    }

    #[must_use]
    pub fn is_sample_complete(&self, sample: &SampleId) -> bool {
        self.answers.is_complete(sample, &self.config.metrics)
    }

    /// Whether the sample on the current page is complete. Prompt pages always are.
    #[must_use]
    pub fn current_page_complete(&self) -> bool {
        match self.state.page() {
            Page::Prompt => true,
            Page::Sample(index) => self
                .config
                .samples
                .get(index)
                .is_none_or(|sample| self.is_sample_complete(sample)),
        }
    }

    #[must_use]
    pub fn missing(&self) -> Vec<MissingRatings> {
        all_missing(&self.config, &self.answers)
    }

    /// Rated samples as "Sample N" with their metric values, in config order.
    #[must_use]
    pub fn summary(&self) -> Vec<SampleSummary> {
        self.config
            .samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                let rated = self.answers.sample(sample)?;
                let ratings: Vec<(String, i64)> = self
                    .config
                    .metrics
                    .iter()
                    .filter_map(|m| rated.get(m.name()).map(|v| (m.name().to_string(), *v)))
                    .collect();
                (!ratings.is_empty()).then(|| SampleSummary {
                    label: format!("Sample {}", index + 1),
                    sample: sample.clone(),
                    ratings,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.timer.elapsed_secs(&self.clock)
    }

    /// Body for the save call, using the configured answer layout.
    #[must_use]
    pub fn save_request(&self) -> SaveRequest {
        SaveRequest {
            original_question_id: self.config.question_id.clone(),
            question_index: self.config.question_index,
            answers: self.answers.to_payload(self.options.answer_layout),
            time_spent: self.elapsed_secs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}
