use std::env;
use std::time::Duration;

use url::Url;

use listening_core::model::{AnswerLayout, AudioUrlTemplate, ConfigError};

use crate::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use crate::story::StoryOptions;

pub const ENV_BASE_URL: &str = "SURVEY_BASE_URL";
pub const ENV_HEARTBEAT_SECS: &str = "SURVEY_HEARTBEAT_SECS";
pub const ENV_AUDIO_TEMPLATE: &str = "SURVEY_AUDIO_TEMPLATE";
pub const ENV_AUTO_ADVANCE: &str = "SURVEY_AUTO_ADVANCE";
pub const ENV_ANSWER_LAYOUT: &str = "SURVEY_ANSWER_LAYOUT";
pub const ENV_DEBUG: &str = "SURVEY_DEBUG";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Client-side settings shared by the API client, audio loader and story sessions.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub heartbeat_interval: Duration,
    pub audio_template: AudioUrlTemplate,
    pub auto_advance: bool,
    pub answer_layout: AnswerLayout,
    pub force_debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            audio_template: AudioUrlTemplate::default(),
            auto_advance: true,
            answer_layout: AnswerLayout::default(),
            force_debug: false,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(raw) = read(ENV_BASE_URL) {
            match parse_base_url(&raw) {
                Ok(url) => config.base_url = url,
                Err(err) => log::warn!("ignoring {ENV_BASE_URL}: {err}"),
            }
        }
        if let Some(raw) = read(ENV_HEARTBEAT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.heartbeat_interval = Duration::from_secs(secs),
                _ => log::warn!("ignoring invalid {ENV_HEARTBEAT_SECS}: {raw:?}"),
            }
        }
        if let Some(raw) = read(ENV_AUDIO_TEMPLATE) {
            config.audio_template = AudioUrlTemplate::new(raw);
        }
        if let Some(raw) = read(ENV_AUTO_ADVANCE) {
            match parse_bool(&raw) {
                Some(value) => config.auto_advance = value,
                None => log::warn!("ignoring invalid {ENV_AUTO_ADVANCE}: {raw:?}"),
            }
        }
        if let Some(raw) = read(ENV_ANSWER_LAYOUT) {
            match AnswerLayout::parse(&raw) {
                Some(layout) => config.answer_layout = layout,
                None => log::warn!("ignoring invalid {ENV_ANSWER_LAYOUT}: {raw:?}"),
            }
        }
        if let Some(raw) = read(ENV_DEBUG) {
            match parse_bool(&raw) {
                Some(value) => config.force_debug = value,
                None => log::warn!("ignoring invalid {ENV_DEBUG}: {raw:?}"),
            }
        }
        config
    }

    /// Override the server base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `raw` is not an absolute URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    #[must_use]
    pub fn story_options(&self) -> StoryOptions {
        StoryOptions {
            auto_advance: self.auto_advance,
            answer_layout: self.answer_layout,
            force_debug: self.force_debug,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base url should be valid")
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|err| ConfigError::InvalidUrl {
        raw: raw.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            raw: raw.to_string(),
            reason: "not a base url".to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
