use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use listening_core::model::{PromptId, QuestionId};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Body of `POST /api/save`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub original_question_id: QuestionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<u32>,
    pub answers: serde_json::Value,
    /// Seconds spent on the question.
    pub time_spent: f64,
}

/// `{success, error?, resultFile?}` as returned by save and finish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            result_file: None,
        }
    }

    #[must_use]
    pub fn with_result_file(mut self, file: impl Into<String>) -> Self {
        self.result_file = Some(file.into());
        self
    }
}

/// The survey server's REST surface.
#[async_trait]
pub trait SurveyApi: Send + Sync {
    /// Persist answers for the current question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unparseable error status.
    async fn save(&self, request: &SaveRequest) -> Result<ApiResponse, ApiError>;

    /// Mark the participant's test as complete.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unparseable error status.
    async fn finish(&self) -> Result<ApiResponse, ApiError>;

    /// Keep-alive ping.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the ping does not succeed.
    async fn heartbeat(&self) -> Result<(), ApiError>;

    /// Audio filenames available for a prompt.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decode failure.
    async fn list_audio(&self, prompt: &PromptId) -> Result<Vec<String>, ApiError>;
}

#[derive(Clone)]
pub struct HttpSurveyApi {
    client: Client,
    base_url: Url,
}

impl HttpSurveyApi {
    #[must_use]
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Client::new(), config.base_url.clone())
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl SurveyApi for HttpSurveyApi {
    async fn save(&self, request: &SaveRequest) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/save")?)
            .json(request)
            .send()
            .await?;
        let body = read_api_response(response).await?;
        log::info!(
            "save for question {} returned success={}",
            request.original_question_id,
            body.success
        );
        Ok(body)
    }

    async fn finish(&self) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/finish")?)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let body = read_api_response(response).await?;
        log::info!("finish returned success={}", body.success);
        Ok(body)
    }

    async fn heartbeat(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.endpoint("api/heartbeat")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }
        Ok(())
    }

    async fn list_audio(&self, prompt: &PromptId) -> Result<Vec<String>, ApiError> {
        let path = format!("api/audio/list/{prompt}");
        let response = self.client.get(self.endpoint(&path)?).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

/// Error statuses still carry a usable body when the server explains itself.
async fn read_api_response(response: Response) -> Result<ApiResponse, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.bytes().await?;
    match serde_json::from_slice::<ApiResponse>(&body) {
        Ok(parsed) => {
            log::warn!("server answered {status} with {parsed:?}");
            Ok(parsed)
        }
        Err(_) => Err(ApiError::HttpStatus(status)),
    }
}
