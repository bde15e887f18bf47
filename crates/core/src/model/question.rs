use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::model::ids::{PromptId, QuestionId, SampleId};
use crate::model::metric::Metric;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("question attributes must be a JSON object or array of objects")]
    InvalidDocument,

    #[error("invalid questions JSON: {0}")]
    Json(String),

    #[error("invalid url {raw}: {reason}")]
    InvalidUrl { raw: String, reason: String },
}

//
// ─── ATTRIBUTE CONTRACT ────────────────────────────────────────────────────────
//

pub const ATTR_QUESTION_ID: &str = "data-question-id";
pub const ATTR_QUESTION_INDEX: &str = "data-question-index";
pub const ATTR_PROMPT_ID: &str = "data-prompt-id";
pub const ATTR_MODELS: &str = "data-models";
pub const ATTR_METRICS: &str = "data-metrics";
pub const ATTR_IS_LAST: &str = "data-is-last";
pub const ATTR_NEXT_URL: &str = "data-next-url";
pub const ATTR_PREV_URL: &str = "data-prev-url";
pub const ATTR_AUDIO_ROOT: &str = "data-audio-root";
pub const ATTR_DEBUG_MODE: &str = "data-debug-mode";

/// Samples used when the markup does not name any.
pub const DEFAULT_SAMPLES: [&str; 3] = ["gt", "methodA", "methodB"];
pub const DEFAULT_AUDIO_ROOT: &str = "static/audio";

/// Read-only view over string attributes carried by the page markup.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Owned attribute set for one question.
pub type AttributeMap = BTreeMap<String, String>;

/// Parse a questions document: either one attribute object or an array of them.
///
/// Non-string values are kept as their JSON text, so `"data-models": ["gt"]`
/// reads the same as `"data-models": "[\"gt\"]"`.
///
/// # Errors
///
/// Returns `ConfigError::Json` for malformed JSON and
/// `ConfigError::InvalidDocument` when the shape is not object(s).
pub fn parse_attribute_document(raw: &str) -> Result<Vec<AttributeMap>, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| ConfigError::Json(err.to_string()))?;
    match value {
        serde_json::Value::Object(obj) => Ok(vec![attribute_map_from_object(obj)]),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::Object(obj) => Ok(attribute_map_from_object(obj)),
                _ => Err(ConfigError::InvalidDocument),
            })
            .collect(),
        _ => Err(ConfigError::InvalidDocument),
    }
}

fn attribute_map_from_object(obj: serde_json::Map<String, serde_json::Value>) -> AttributeMap {
    obj.into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

//
// ─── QUESTION CONFIG ───────────────────────────────────────────────────────────
//

/// Everything the client needs to run one question's story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionConfig {
    pub question_id: QuestionId,
    pub question_index: Option<u32>,
    pub prompt_id: PromptId,
    pub samples: Vec<SampleId>,
    pub metrics: Vec<Metric>,
    pub is_last: bool,
    pub next_url: Option<String>,
    pub prev_url: Option<String>,
    pub audio_root: String,
    pub debug: bool,
    /// True when `samples` came from `DEFAULT_SAMPLES` rather than the markup.
    pub samples_defaulted: bool,
}

impl QuestionConfig {
    /// Read a question from the markup attribute contract.
    ///
    /// Malformed structured attributes fall back to defaults and are logged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingAttribute` when the question or prompt id is absent.
    pub fn from_attributes(attrs: &impl AttributeSource) -> Result<Self, ConfigError> {
        let question_id = required(attrs, ATTR_QUESTION_ID)?;
        let prompt_id = required(attrs, ATTR_PROMPT_ID)?;

        let question_index = attrs.attribute(ATTR_QUESTION_INDEX).and_then(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| log::warn!("ignoring invalid {ATTR_QUESTION_INDEX}: {raw:?}"))
                .ok()
        });

        let (samples, samples_defaulted) = parse_samples(attrs.attribute(ATTR_MODELS));
        let metrics = parse_metrics(attrs.attribute(ATTR_METRICS));

        Ok(Self {
            question_id: QuestionId::new(question_id),
            question_index,
            prompt_id: PromptId::new(prompt_id),
            samples,
            metrics,
            is_last: flag(attrs, ATTR_IS_LAST),
            next_url: optional(attrs, ATTR_NEXT_URL),
            prev_url: optional(attrs, ATTR_PREV_URL),
            audio_root: optional(attrs, ATTR_AUDIO_ROOT)
                .unwrap_or_else(|| DEFAULT_AUDIO_ROOT.to_string()),
            debug: flag(attrs, ATTR_DEBUG_MODE),
            samples_defaulted,
        })
    }

    /// One prompt page plus one page per sample.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        1 + self.samples.len()
    }

    #[must_use]
    pub fn sample_index(&self, sample: &SampleId) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    /// Replace defaulted samples with ones discovered elsewhere.
    pub fn replace_samples(&mut self, samples: Vec<SampleId>) {
        if samples.is_empty() {
            return;
        }
        self.samples = samples;
        self.samples_defaulted = false;
    }
}

fn required(attrs: &impl AttributeSource, name: &'static str) -> Result<String, ConfigError> {
    optional(attrs, name).ok_or(ConfigError::MissingAttribute(name))
}

fn optional(attrs: &impl AttributeSource, name: &str) -> Option<String> {
    attrs
        .attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn flag(attrs: &impl AttributeSource, name: &str) -> bool {
    attrs.attribute(name).map(str::trim) == Some("true")
}

fn default_samples() -> Vec<SampleId> {
    DEFAULT_SAMPLES.iter().map(|s| SampleId::new(*s)).collect()
}

fn parse_samples(raw: Option<&str>) -> (Vec<SampleId>, bool) {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        log::warn!("{ATTR_MODELS} missing, using default samples");
        return (default_samples(), true);
    };
    match serde_json::from_str::<Vec<SampleId>>(raw) {
        Ok(samples) if samples.is_empty() => {
            log::warn!("{ATTR_MODELS} is empty, using default samples");
            (default_samples(), true)
        }
        Ok(samples) => (samples, false),
        Err(err) => {
            log::error!("error parsing {ATTR_MODELS}: {err}");
            (default_samples(), true)
        }
    }
}

fn parse_metrics(raw: Option<&str>) -> Vec<Metric> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        log::warn!("{ATTR_METRICS} missing, no metrics will be rated");
        return Vec::new();
    };
    serde_json::from_str::<Vec<Metric>>(raw).unwrap_or_else(|err| {
        log::error!("error parsing {ATTR_METRICS}: {err}");
        Vec::new()
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
