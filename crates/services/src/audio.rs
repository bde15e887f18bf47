//! Audio loading with per-URL deduplication and an optional persistent cache.
//!
//! Every URL gets a `OnceCell`; concurrent `load` calls for the same URL share
//! one fetch. Failed loads leave the cell empty so the next call retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use base64::prelude::*;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use url::Url;

use listening_core::Clock;
use listening_core::model::{
    AudioTrack, AudioUrlTemplate, PromptId, QuestionConfig, SampleId, samples_from_filenames,
};
use storage::repository::{AudioCacheRepository, CachedAudio};

use crate::api::{HttpSurveyApi, SurveyApi};
use crate::error::{ApiError, AudioError};

/// Raw response of an audio request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAudio {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download `url`.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` on transport failure or a non-success status.
    async fn fetch(&self, url: &Url) -> Result<FetchedAudio, AudioError>;
}

#[async_trait]
impl AudioFetcher for HttpSurveyApi {
    async fn fetch(&self, url: &Url) -> Result<FetchedAudio, AudioError> {
        let fetch_error = |err: reqwest::Error| AudioError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        };
        let response = self
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AudioError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(fetch_error)?;
        Ok(FetchedAudio {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Bytes for one URL, held for the life of the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAudio {
    pub url: Url,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub from_cache: bool,
}

impl LoadedAudio {
    #[must_use]
    pub fn mime(&self) -> &str {
        self.content_type.as_deref().unwrap_or("audio/mpeg")
    }

    /// Inline `data:` URL the webview can play without another request.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime(),
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

/// What to put in an `<audio src>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    Cached(String),
    Direct(String),
}

impl PlaybackSource {
    #[must_use]
    pub fn src(&self) -> &str {
        match self {
            PlaybackSource::Cached(src) | PlaybackSource::Direct(src) => src,
        }
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, PlaybackSource::Cached(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadFailure {
    pub track: AudioTrack,
    pub url: Option<String>,
    pub error: AudioError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub total: usize,
    pub loaded: usize,
    pub failures: Vec<PreloadFailure>,
}

impl PreloadReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type Cell = Arc<OnceCell<Arc<LoadedAudio>>>;

#[derive(Clone)]
pub struct AudioLoader {
    fetcher: Arc<dyn AudioFetcher>,
    cache: Option<Arc<dyn AudioCacheRepository>>,
    base_url: Url,
    template: AudioUrlTemplate,
    clock: Clock,
    cells: Arc<Mutex<HashMap<String, Cell>>>,
}

impl AudioLoader {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        base_url: Url,
        template: AudioUrlTemplate,
        clock: Clock,
    ) -> Self {
        Self {
            fetcher,
            cache: None,
            base_url,
            template,
            clock,
            cells: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn AudioCacheRepository>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Absolute URL for one track of a question.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::Config` when the template does not resolve.
    pub fn track_url(&self, config: &QuestionConfig, track: &AudioTrack) -> Result<Url, AudioError> {
        Ok(self.template.resolve(
            &self.base_url,
            &config.audio_root,
            &config.prompt_id,
            track.tag(),
        )?)
    }

    fn cell(&self, url: &Url) -> Cell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(url.to_string()).or_default())
    }

    /// Load `url`, sharing any in-flight or finished load of the same URL.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` when neither the cache nor the network yields bytes.
    pub async fn load(&self, url: &Url) -> Result<Arc<LoadedAudio>, AudioError> {
        let cell = self.cell(url);
        let loaded = cell
            .get_or_try_init(|| async { self.load_uncached(url).await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(loaded))
    }

    async fn load_uncached(&self, url: &Url) -> Result<LoadedAudio, AudioError> {
        if let Some(cache) = &self.cache {
            match cache.match_url(url.as_str()).await {
                Ok(Some(hit)) => {
                    log::debug!("audio cache hit for {url}");
                    return Ok(LoadedAudio {
                        url: url.clone(),
                        bytes: hit.bytes,
                        content_type: hit.content_type,
                        from_cache: true,
                    });
                }
                Ok(None) => log::debug!("audio cache miss for {url}"),
                Err(err) => log::warn!("audio cache lookup failed for {url}: {err}"),
            }
        }

        let fetched = self.fetcher.fetch(url).await.inspect_err(|err| {
            log::error!("error loading audio: {err}");
        })?;

        if let Some(cache) = &self.cache {
            let entry = CachedAudio::new(
                url.as_str(),
                fetched.content_type.clone(),
                fetched.bytes.clone(),
                self.clock.now(),
            );
            if let Err(err) = cache.put(&entry).await {
                log::warn!("could not cache audio for {url}: {err}");
            }
        }

        Ok(LoadedAudio {
            url: url.clone(),
            bytes: fetched.bytes,
            content_type: fetched.content_type,
            from_cache: false,
        })
    }

    /// Bytes already loaded for `url`, without starting a load.
    #[must_use]
    pub fn loaded(&self, url: &Url) -> Option<Arc<LoadedAudio>> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(url.as_str()).and_then(|cell| cell.get().cloned())
    }

    #[must_use]
    pub fn playable_source(&self, url: &Url) -> PlaybackSource {
        match self.loaded(url) {
            Some(audio) => PlaybackSource::Cached(audio.data_url()),
            None => PlaybackSource::Direct(url.to_string()),
        }
    }

    /// Sources for every track of `config`, in page order.
    ///
    /// Tracks whose URL does not resolve get an empty direct source.
    #[must_use]
    pub fn sources_for(&self, config: &QuestionConfig) -> Vec<(AudioTrack, PlaybackSource)> {
        AudioTrack::all_for(config)
            .into_iter()
            .map(|track| {
                let source = match self.track_url(config, &track) {
                    Ok(url) => self.playable_source(&url),
                    Err(err) => {
                        log::error!("no audio url for {}: {err}", track.tag());
                        PlaybackSource::Direct(String::new())
                    }
                };
                (track, source)
            })
            .collect()
    }

    /// Load every track of `config` concurrently.
    ///
    /// `on_progress(loaded, total)` runs after each track settles, failed or not.
    pub async fn preload(
        &self,
        config: &QuestionConfig,
        mut on_progress: impl FnMut(usize, usize),
    ) -> PreloadReport {
        let tracks = AudioTrack::all_for(config);
        let mut report = PreloadReport {
            total: tracks.len(),
            ..PreloadReport::default()
        };
        let mut settled = 0;
        let mut tasks = JoinSet::new();

        for track in tracks {
            match self.track_url(config, &track) {
                Ok(url) => {
                    let loader = self.clone();
                    tasks.spawn(async move {
                        let result = loader.load(&url).await.map(|_| ());
                        (track, url, result)
                    });
                }
                Err(error) => {
                    settled += 1;
                    on_progress(settled, report.total);
                    report.failures.push(PreloadFailure {
                        track,
                        url: None,
                        error,
                    });
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            settled += 1;
            match joined {
                Ok((_, _, Ok(()))) => report.loaded += 1,
                Ok((track, url, Err(error))) => report.failures.push(PreloadFailure {
                    track,
                    url: Some(url.to_string()),
                    error,
                }),
                Err(err) => log::error!("audio preload task failed: {err}"),
            }
            on_progress(settled, report.total);
        }

        log::info!(
            "preloaded {}/{} tracks for prompt {}",
            report.loaded,
            report.total,
            config.prompt_id
        );
        report
    }
}

/// Sample tags the server has audio for, in listing order.
///
/// # Errors
///
/// Returns `ApiError` when the listing request fails.
pub async fn discover_samples(
    api: &dyn SurveyApi,
    prompt: &PromptId,
) -> Result<Vec<SampleId>, ApiError> {
    let files = api.list_audio(prompt).await?;
    Ok(samples_from_filenames(prompt, &files))
}
