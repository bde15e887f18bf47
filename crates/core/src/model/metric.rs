use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised while recording a rating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RatingError {
    #[error("unknown sample: {0}")]
    UnknownSample(String),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("rating {value} for {metric} is outside {min}..={max}")]
    OutOfScale {
        metric: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

//
// ─── SCALE ────────────────────────────────────────────────────────────────────
//

/// Inclusive integer range a metric is rated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: i64,
    pub max: i64,
}

impl RatingScale {
    pub const DEFAULT_MIN: i64 = 1;
    pub const DEFAULT_MAX: i64 = 5;
    /// Widest span rendered as buttons.
    pub const MAX_SPAN: i64 = 100;

    /// Builds a scale, swapping the bounds when given in reverse.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Like [`RatingScale::new`], but `None` when the span exceeds `MAX_SPAN`.
    #[must_use]
    pub fn bounded(min: i64, max: i64) -> Option<Self> {
        let scale = Self::new(min, max);
        match scale.max.checked_sub(scale.min) {
            Some(span) if span <= Self::MAX_SPAN => Some(scale),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// All values of the scale in ascending order, one per rating button.
    #[must_use]
    pub fn values(self) -> Vec<i64> {
        (self.min..=self.max).collect()
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

//
// ─── METRIC ───────────────────────────────────────────────────────────────────
//

/// A named rating dimension such as "naturalness" or "consistency".
///
/// Deserializes from either a bare string (`"quality"`) or an object
/// (`{"name": "quality", "description": "...", "min": 1, "max": 5}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MetricRepr")]
pub struct Metric {
    name: String,
    description: Option<String>,
    scale: RatingScale,
}

impl Metric {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            scale: RatingScale::default(),
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: RatingScale) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Checks that `value` lies on this metric's scale.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfScale` when it does not.
    pub fn check(&self, value: i64) -> Result<(), RatingError> {
        if self.scale.contains(value) {
            Ok(())
        } else {
            Err(RatingError::OutOfScale {
                metric: self.name.clone(),
                value,
                min: self.scale.min,
                max: self.scale.max,
            })
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetricRepr {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
}

impl From<MetricRepr> for Metric {
    fn from(repr: MetricRepr) -> Self {
        match repr {
            MetricRepr::Name(name) => Metric::new(name),
            MetricRepr::Detailed {
                name,
                description,
                min,
                max,
            } => {
                let min = min.unwrap_or(RatingScale::DEFAULT_MIN);
                let max = max.unwrap_or(RatingScale::DEFAULT_MAX);
                let scale = RatingScale::bounded(min, max).unwrap_or_else(|| {
                    log::warn!("metric {name}: scale {min}..={max} is too wide, using default");
                    RatingScale::default()
                });
                Metric {
                    name,
                    description: description.filter(|d| !d.trim().is_empty()),
                    scale,
                }
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
