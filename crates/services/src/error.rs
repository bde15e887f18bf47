//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use listening_core::model::ConfigError;
use listening_core::story::{MissingRatings, missing_alert_message};
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SurveyApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("survey request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("invalid survey endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while loading audio bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioError {
    #[error("audio request for {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("audio request for {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Which call of the submit workflow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    Save,
    Finish,
}

impl SubmitStage {
    fn prefix(self) -> &'static str {
        match self {
            SubmitStage::Save => "Error saving answers",
            SubmitStage::Finish => "Error finishing test",
        }
    }
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStage::Save => f.write_str("save"),
            SubmitStage::Finish => f.write_str("finish"),
        }
    }
}

/// Errors emitted by `submit_answers`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("{} sample(s) still have unrated metrics", .0.len())]
    Incomplete(Vec<MissingRatings>),
    #[error("{stage} request failed: {source}")]
    Api {
        stage: SubmitStage,
        #[source]
        source: ApiError,
    },
    #[error("{stage} rejected by server: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected {
        stage: SubmitStage,
        message: Option<String>,
    },
}

impl SubmitError {
    /// Text for the blocking alert shown to the participant.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Incomplete(missing) => missing_alert_message(missing),
            SubmitError::Api { stage, .. } => format!("{}. Please try again.", stage.prefix()),
            SubmitError::Rejected { stage, message } => format!(
                "{}: {}",
                stage.prefix(),
                message.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesError {
    #[error("audio cache: {0}")]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use listening_core::model::SampleId;

    #[test]
    fn user_messages_follow_stage() {
        let api = SubmitError::Api {
            stage: SubmitStage::Save,
            source: ApiError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY),
        };
        assert_eq!(api.user_message(), "Error saving answers. Please try again.");

        let rejected = SubmitError::Rejected {
            stage: SubmitStage::Save,
            message: Some("disk full".into()),
        };
        assert_eq!(rejected.user_message(), "Error saving answers: disk full");

        let unknown = SubmitError::Rejected {
            stage: SubmitStage::Finish,
            message: None,
        };
        assert_eq!(unknown.user_message(), "Error finishing test: Unknown error");
    }

    #[test]
    fn incomplete_lists_missing_metrics() {
        let err = SubmitError::Incomplete(vec![MissingRatings {
            sample: SampleId::new("gt"),
            sample_number: 1,
            metrics: vec!["quality".into()],
        }]);
        assert!(err.user_message().contains("quality"));
    }
}
