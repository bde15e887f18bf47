use crate::api::{ApiResponse, SurveyApi};
use crate::error::{ApiError, SubmitError, SubmitStage};

use super::session::StorySession;

/// Where the participant goes after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    NextQuestion { next_url: Option<String> },
    Finished { result_file: Option<String> },
}

/// Save the session's answers, then finish the test if this is the last question.
///
/// `finish` only runs after `save` succeeds.
///
/// # Errors
///
/// Returns `SubmitError::Incomplete` when ratings are missing outside debug mode,
/// or `Api`/`Rejected` for the failing stage.
pub async fn submit_answers(
    session: &StorySession,
    api: &dyn SurveyApi,
) -> Result<SubmitOutcome, SubmitError> {
    if !session.debug() {
        let missing = session.missing();
        if !missing.is_empty() {
            return Err(SubmitError::Incomplete(missing));
        }
    }

    let request = session.save_request();
    checked(SubmitStage::Save, api.save(&request).await)?;

    let config = session.config();
    if !config.is_last {
        log::info!("saved question {}", config.question_id);
        return Ok(SubmitOutcome::NextQuestion {
            next_url: config.next_url.clone(),
        });
    }

    let finished = checked(SubmitStage::Finish, api.finish().await)?;
    log::info!(
        "test finished, result file {}",
        finished.result_file.as_deref().unwrap_or("-")
    );
    Ok(SubmitOutcome::Finished {
        result_file: finished.result_file,
    })
}

fn checked(
    stage: SubmitStage,
    result: Result<ApiResponse, ApiError>,
) -> Result<ApiResponse, SubmitError> {
    match result {
        Ok(response) if response.success => Ok(response),
        Ok(response) => {
            log::error!("{stage} rejected: {:?}", response.error);
            Err(SubmitError::Rejected {
                stage,
                message: response.error,
            })
        }
        Err(source) => {
            log::error!("{stage} failed: {source}");
            Err(SubmitError::Api { stage, source })
        }
    }
}
