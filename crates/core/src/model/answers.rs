use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::SampleId;
use crate::model::metric::Metric;

/// How answers are laid out in the save payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerLayout {
    /// `{"<sample>_<metric>": value}`
    #[default]
    Flat,
    /// `{"<sample>": {"<metric>": value}}`
    Nested,
}

impl AnswerLayout {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "nested" => Some(Self::Nested),
            _ => None,
        }
    }
}

/// Ratings captured for the current question.
///
/// Keyed by sample, then metric name. A missing entry means the metric has not
/// been rated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap {
    ratings: BTreeMap<SampleId, BTreeMap<String, i64>>,
}

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `(sample, metric)`, returning the previous value.
    pub fn set(&mut self, sample: &SampleId, metric: &str, value: i64) -> Option<i64> {
        self.ratings
            .entry(sample.clone())
            .or_default()
            .insert(metric.to_string(), value)
    }

    #[must_use]
    pub fn get(&self, sample: &SampleId, metric: &str) -> Option<i64> {
        self.ratings
            .get(sample)
            .and_then(|metrics| metrics.get(metric))
            .copied()
    }

    /// Ratings recorded for one sample, if any.
    #[must_use]
    pub fn sample(&self, sample: &SampleId) -> Option<&BTreeMap<String, i64>> {
        self.ratings.get(sample)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.values().all(BTreeMap::is_empty)
    }

    /// True iff every configured metric has a value for `sample`.
    #[must_use]
    pub fn is_complete(&self, sample: &SampleId, metrics: &[Metric]) -> bool {
        metrics
            .iter()
            .all(|metric| self.get(sample, metric.name()).is_some())
    }

    /// Names of configured metrics still unrated for `sample`, in config order.
    #[must_use]
    pub fn missing_metrics(&self, sample: &SampleId, metrics: &[Metric]) -> Vec<String> {
        metrics
            .iter()
            .filter(|metric| self.get(sample, metric.name()).is_none())
            .map(|metric| metric.name().to_string())
            .collect()
    }

    /// Render the map as a JSON object in the requested layout.
    #[must_use]
    pub fn to_payload(&self, layout: AnswerLayout) -> serde_json::Value {
        match layout {
            AnswerLayout::Flat => {
                let mut flat = serde_json::Map::new();
                for (sample, metrics) in &self.ratings {
                    for (metric, value) in metrics {
                        flat.insert(format!("{sample}_{metric}"), (*value).into());
                    }
                }
                serde_json::Value::Object(flat)
            }
            AnswerLayout::Nested => {
                serde_json::to_value(&self.ratings).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}
