use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use listening_core::model::{
    ATTR_IS_LAST, ATTR_METRICS, ATTR_MODELS, ATTR_NEXT_URL, ATTR_PROMPT_ID, ATTR_QUESTION_ID,
    AttributeMap, PromptId, QuestionConfig, SampleId,
};
use listening_core::story::{NavDirection, NavSource};
use listening_core::time::fixed_clock;
use services::{
    ApiError, ApiResponse, AppServices, AudioError, AudioFetcher, ClientConfig, FetchedAudio,
    NavOutcome, SaveRequest, StoryOptions, StorySession, SubmitError, SubmitOutcome, SurveyApi,
    submit_answers,
};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Save(SaveRequest),
    Finish,
    List(String),
}

/// Records every call and answers from canned responses.
struct RecordingApi {
    calls: Mutex<Vec<Call>>,
    save: Mutex<Option<Result<ApiResponse, ApiError>>>,
    finish: ApiResponse,
    listing: Vec<String>,
}

impl RecordingApi {
    fn new(save: Result<ApiResponse, ApiError>, finish: ApiResponse) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            save: Mutex::new(Some(save)),
            finish,
            listing: Vec::new(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurveyApi for RecordingApi {
    async fn save(&self, request: &SaveRequest) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(Call::Save(request.clone()));
        self.save
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(ApiResponse::ok()))
    }

    async fn finish(&self) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(Call::Finish);
        Ok(self.finish.clone())
    }

    async fn heartbeat(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_audio(&self, prompt: &PromptId) -> Result<Vec<String>, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::List(prompt.to_string()));
        Ok(self.listing.clone())
    }
}

struct NoAudio;

#[async_trait]
impl AudioFetcher for NoAudio {
    async fn fetch(&self, url: &Url) -> Result<FetchedAudio, AudioError> {
        Err(AudioError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn question(is_last: bool) -> QuestionConfig {
    let attrs: AttributeMap = [
        (ATTR_QUESTION_ID, "q7"),
        (ATTR_PROMPT_ID, "007"),
        (ATTR_MODELS, r#"["gt","methodA"]"#),
        (ATTR_METRICS, r#"["naturalness","consistency","quality"]"#),
        (ATTR_IS_LAST, if is_last { "true" } else { "false" }),
        (ATTR_NEXT_URL, "/questions/8"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    QuestionConfig::from_attributes(&attrs).unwrap()
}

fn rate_all(session: &mut StorySession) {
    for sample in session.config().samples.clone() {
        for metric in ["naturalness", "consistency", "quality"] {
            session.rate(&sample, metric, 4).unwrap();
        }
    }
}

#[tokio::test]
async fn last_question_saves_then_finishes() {
    let api = RecordingApi::new(
        Ok(ApiResponse::ok()),
        ApiResponse::ok().with_result_file("results/p1.json"),
    );
    let mut session = StorySession::new(question(true), StoryOptions::default(), fixed_clock());
    rate_all(&mut session);

    let outcome = submit_answers(&session, &api).await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Finished {
            result_file: Some("results/p1.json".into())
        }
    );

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    let Call::Save(request) = &calls[0] else {
        panic!("save must come first: {calls:?}");
    };
    assert_eq!(request.answers["methodA_quality"], 4);
    assert_eq!(calls[1], Call::Finish);
}

#[tokio::test]
async fn rejected_save_never_finishes() {
    let api = RecordingApi::new(Ok(ApiResponse::failed("quota exceeded")), ApiResponse::ok());
    let mut session = StorySession::new(question(true), StoryOptions::default(), fixed_clock());
    rate_all(&mut session);

    let err = submit_answers(&session, &api).await.unwrap_err();
    assert_eq!(err.user_message(), "Error saving answers: quota exceeded");
    assert!(!api.calls().contains(&Call::Finish));
}

#[tokio::test]
async fn transport_error_asks_to_retry() {
    let api = RecordingApi::new(
        Err(ApiError::HttpStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR)),
        ApiResponse::ok(),
    );
    let mut session = StorySession::new(question(false), StoryOptions::default(), fixed_clock());
    rate_all(&mut session);

    let err = submit_answers(&session, &api).await.unwrap_err();
    assert!(matches!(err, SubmitError::Api { .. }));
    assert_eq!(err.user_message(), "Error saving answers. Please try again.");

    // Retrying with a now-healthy server goes through.
    let outcome = submit_answers(&session, &api).await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::NextQuestion {
            next_url: Some("/questions/8".into())
        }
    );
}

#[tokio::test]
async fn incomplete_answers_block_submit_unless_debug() {
    let api = RecordingApi::new(Ok(ApiResponse::ok()), ApiResponse::ok());
    let mut session = StorySession::new(question(false), StoryOptions::default(), fixed_clock());
    session
        .rate(&SampleId::new("gt"), "naturalness", 3)
        .unwrap();

    let err = submit_answers(&session, &api).await.unwrap_err();
    let SubmitError::Incomplete(missing) = &err else {
        panic!("expected incomplete, got {err:?}");
    };
    assert_eq!(missing.len(), 2);
    assert!(api.calls().is_empty());

    let debug = StorySession::new(
        question(false),
        StoryOptions {
            force_debug: true,
            ..StoryOptions::default()
        },
        fixed_clock(),
    );
    assert!(submit_answers(&debug, &api).await.is_ok());
}

#[tokio::test]
async fn walking_the_story_ends_in_submit() {
    let mut session = StorySession::new(question(false), StoryOptions::default(), fixed_clock());
    assert!(matches!(
        session.navigate(NavDirection::Forward, NavSource::Keyboard),
        NavOutcome::Moved(_)
    ));

    let NavOutcome::Blocked(missing) = session.navigate(NavDirection::Forward, NavSource::Swipe)
    else {
        panic!("unrated sample must block");
    };
    assert_eq!(missing.metrics.len(), 3);

    rate_all(&mut session);
    assert!(matches!(
        session.navigate(NavDirection::Forward, NavSource::Click),
        NavOutcome::Moved(_)
    ));
    assert_eq!(
        session.navigate(NavDirection::Forward, NavSource::Click),
        NavOutcome::Submit
    );
}

#[tokio::test]
async fn defaulted_samples_are_replaced_from_listing() {
    let mut api = RecordingApi::new(Ok(ApiResponse::ok()), ApiResponse::ok());
    api.listing = vec![
        "007_prompt.mp3".into(),
        "007_gt.mp3".into(),
        "007_diffusion.mp3".into(),
        "008_gt.mp3".into(),
    ];
    let api = Arc::new(api);
    let services = AppServices::from_parts(
        ClientConfig::default(),
        api.clone(),
        Arc::new(NoAudio),
        None,
        fixed_clock(),
    );

    let attrs: AttributeMap = [(ATTR_QUESTION_ID, "q7"), (ATTR_PROMPT_ID, "007")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut config = QuestionConfig::from_attributes(&attrs).unwrap();
    assert!(config.samples_defaulted);

    services.discover_defaulted_samples(&mut config).await;
    assert_eq!(
        config.samples,
        vec![SampleId::new("gt"), SampleId::new("diffusion")]
    );
    assert_eq!(api.calls(), vec![Call::List("007".into())]);

    // Already explicit: no second listing.
    services.discover_defaulted_samples(&mut config).await;
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn failed_preload_falls_back_to_direct_urls() {
    let api = Arc::new(RecordingApi::new(Ok(ApiResponse::ok()), ApiResponse::ok()));
    let services = AppServices::from_parts(
        ClientConfig::default(),
        api,
        Arc::new(NoAudio),
        None,
        fixed_clock(),
    );
    let config = question(false);
    let report = services.audio().preload(&config, |_, _| {}).await;
    assert_eq!(report.total, 3);
    assert_eq!(report.failures.len(), 3);

    let sources = services.audio().sources_for(&config);
    assert_eq!(
        sources[0].1.src(),
        "http://127.0.0.1:5000/api/audio/007_prompt.mp3"
    );
    assert!(!sources[1].1.is_cached());
}
