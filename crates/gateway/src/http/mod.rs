use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logisim_core::model::{Quiz, QuizId, Submission, SubmissionResult};
use reqwest::Client;
use url::Url;

use crate::repository::{Gateway, GatewayError, QuizSource, SubmissionSink};

mod mapping;

pub use mapping::status_error;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            access_token: None,
            timeout: Duration::from_secs(15),
        }
    }
}

impl ApiConfig {
    /// Reads `LOGISIM_API_BASE_URL` and `LOGISIM_ACCESS_TOKEN`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("LOGISIM_API_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let access_token = env::var("LOGISIM_ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self {
            base_url,
            access_token,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.access_token = token;
        }
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `{base}/quizzes/{id}` with the id percent-encoded as one path segment.
    pub(crate) fn quiz_url(&self, id: &QuizId) -> Result<Url, GatewayError> {
        let invalid = || GatewayError::Validation(format!("invalid base url: {}", self.base_url));
        let mut url = Url::parse(&self.endpoint("quizzes")).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .push(id.as_str());
        Ok(url)
    }
}

/// REST client for the quiz endpoints.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: ApiConfig,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns `GatewayError::Network` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl QuizSource for HttpGateway {
    async fn fetch_quiz(&self, id: &QuizId) -> Result<Quiz, GatewayError> {
        let url = self.config.quiz_url(id)?;
        log::debug!("GET {url}");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        response
            .json::<Quiz>()
            .await
            .map_err(|e| GatewayError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl SubmissionSink for HttpGateway {
    async fn submit_quiz(&self, submission: &Submission) -> Result<SubmissionResult, GatewayError> {
        let url = self.config.endpoint("quizzes/submit");
        log::debug!(
            "POST {url} ({} answers for quiz {})",
            submission.answers.len(),
            submission.quiz_id
        );
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        response
            .json::<SubmissionResult>()
            .await
            .map_err(|e| GatewayError::Serialization(e.to_string()))
    }
}

impl Gateway {
    /// Build a `Gateway` talking to the REST backend.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Network` if the HTTP client cannot be built.
    pub fn http(config: ApiConfig) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(config)?;
        let quizzes: Arc<dyn QuizSource> = Arc::new(gateway.clone());
        let submissions: Arc<dyn SubmissionSink> = Arc::new(gateway);
        Ok(Self {
            quizzes,
            submissions,
        })
    }
}
