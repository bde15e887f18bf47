use std::sync::Arc;

use listening_core::model::QuestionConfig;
use services::{AppServices, AudioLoader, StoryOptions, StorySession, SurveyApi};

pub trait UiApp: Send + Sync {
    /// Questions in presentation order.
    fn questions(&self) -> Vec<QuestionConfig>;
    fn services(&self) -> AppServices;
}

#[derive(Clone)]
pub struct AppContext {
    questions: Arc<Vec<QuestionConfig>>,
    services: AppServices,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            questions: Arc::new(app.questions()),
            services: app.services(),
        }
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<QuestionConfig> {
        self.questions.get(index).cloned()
    }

    /// Fresh story session for the question at `index`.
    #[must_use]
    pub fn start_session(&self, index: usize) -> Option<StorySession> {
        self.question(index)
            .map(|question| self.services.start_session(question))
    }

    #[must_use]
    pub fn story_options(&self) -> StoryOptions {
        self.services.config().story_options()
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn SurveyApi> {
        self.services.api()
    }

    #[must_use]
    pub fn audio(&self) -> AudioLoader {
        self.services.audio()
    }
}

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
