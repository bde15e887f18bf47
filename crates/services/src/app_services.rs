use std::sync::Arc;

use tokio::task::JoinHandle;

use listening_core::model::QuestionConfig;
use storage::repository::Storage;

use crate::Clock;
use crate::api::{HttpSurveyApi, SurveyApi};
use crate::audio::{AudioFetcher, AudioLoader, discover_samples};
use crate::config::ClientConfig;
use crate::error::ServicesError;
use crate::heartbeat::spawn_heartbeat;
use crate::story::StorySession;

/// Assembles the API client, audio loader and story settings for the app.
#[derive(Clone)]
pub struct AppServices {
    config: ClientConfig,
    clock: Clock,
    api: Arc<dyn SurveyApi>,
    audio: AudioLoader,
}

impl AppServices {
    /// Build services talking to `config.base_url`, caching audio in `storage`
    /// when given.
    #[must_use]
    pub fn http(config: ClientConfig, storage: Option<&Storage>, clock: Clock) -> Self {
        let http = Arc::new(HttpSurveyApi::from_config(&config));
        let api: Arc<dyn SurveyApi> = http.clone();
        let fetcher: Arc<dyn AudioFetcher> = http;
        Self::from_parts(config, api, fetcher, storage, clock)
    }

    /// Like [`AppServices::http`], opening a `SQLite` audio cache at
    /// `cache_url` first. `None` runs without a persistent cache.
    ///
    /// # Errors
    ///
    /// Returns `ServicesError` if the cache database cannot be opened.
    pub async fn connect(
        config: ClientConfig,
        cache_url: Option<&str>,
        clock: Clock,
    ) -> Result<Self, ServicesError> {
        let storage = match cache_url {
            Some(url) => {
                log::info!("audio cache: {url}");
                Some(Storage::sqlite(url).await?)
            }
            None => None,
        };
        Ok(Self::http(config, storage.as_ref(), clock))
    }

    #[must_use]
    pub fn from_parts(
        config: ClientConfig,
        api: Arc<dyn SurveyApi>,
        fetcher: Arc<dyn AudioFetcher>,
        storage: Option<&Storage>,
        clock: Clock,
    ) -> Self {
        let mut audio = AudioLoader::new(
            fetcher,
            config.base_url.clone(),
            config.audio_template.clone(),
            clock,
        );
        if let Some(storage) = storage {
            audio = audio.with_cache(Arc::clone(&storage.audio_cache));
        }
        Self {
            config,
            clock,
            api,
            audio,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn SurveyApi> {
        Arc::clone(&self.api)
    }

    #[must_use]
    pub fn audio(&self) -> AudioLoader {
        self.audio.clone()
    }

    #[must_use]
    pub fn start_session(&self, question: QuestionConfig) -> StorySession {
        StorySession::new(question, self.config.story_options(), self.clock)
    }

    /// Start the keep-alive loop on the current runtime.
    #[must_use]
    pub fn spawn_heartbeat(&self) -> JoinHandle<()> {
        spawn_heartbeat(self.api(), self.config.heartbeat_interval)
    }

    /// Replace defaulted samples with those the server lists for the prompt.
    ///
    /// Listing failures are logged and leave the question unchanged.
    pub async fn discover_defaulted_samples(&self, question: &mut QuestionConfig) {
        if !question.samples_defaulted {
            return;
        }
        match discover_samples(self.api.as_ref(), &question.prompt_id).await {
            Ok(samples) if samples.is_empty() => {
                log::warn!("no audio listed for prompt {}", question.prompt_id);
            }
            Ok(samples) => {
                log::info!(
                    "discovered {} samples for prompt {}",
                    samples.len(),
                    question.prompt_id
                );
                question.replace_samples(samples);
            }
            Err(err) => log::error!("could not list audio for {}: {err}", question.prompt_id),
        }
    }
}
