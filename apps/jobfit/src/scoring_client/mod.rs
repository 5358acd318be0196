//! Scoring service client: every call the client makes to the remote
//! resume-scoring service goes through `ScoringService`.
//!
//! `HttpScoringService` is the production implementation. The workflow and
//! the assistant only see the trait, so tests swap in an in-memory fake.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::draft::{DraftInput, UploadFile};
use crate::auth::token_store::SessionToken;
use crate::errors::AppError;
use crate::models::MatchReport;

const LOGIN_ENDPOINT: &str = "/login";
const SIGNUP_ENDPOINT: &str = "/signup";
const ANALYZE_ENDPOINT: &str = "/analyze";
const CHAT_ENDPOINT: &str = "/chat";

/// Operations consumed from the remote scoring service.
#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Exchanges credentials for a bearer token. Rejection → `InvalidCredentials`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<SessionToken, AppError>;

    /// Creates an account and returns its token. Rejection → `SignupRejected`.
    async fn signup(&self, email: &str, password: &str) -> Result<SessionToken, AppError>;

    /// Submits both inputs and returns the raw, unvalidated payload.
    /// 401 → `Unauthorized`; any other failure → `AnalysisFailed`.
    async fn analyze(
        &self,
        resume: &DraftInput,
        job_description: &DraftInput,
        token: &SessionToken,
    ) -> Result<Value, AppError>;

    /// Asks a follow-up question about `report`. Any failure → `ChatFailed`.
    async fn chat(&self, question: &str, report: &MatchReport) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    analysis: &'a MatchReport,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    answer: Option<String>,
}

/// Error body the service sends on failure. Older revisions use `message`.
#[derive(Debug, Default, Deserialize)]
struct ServiceError {
    error: Option<String>,
    message: Option<String>,
}

impl ServiceError {
    fn text(self) -> Option<String> {
        self.error.or(self.message).filter(|t| !t.trim().is_empty())
    }
}

/// reqwest-backed `ScoringService`.
#[derive(Clone)]
pub struct HttpScoringService {
    client: Client,
    base_url: String,
}

impl HttpScoringService {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn post_credentials(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Result<SessionToken, (StatusCode, Option<String>)>, AppError> {
        let url = self.url(endpoint);
        info!("Calling scoring service: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest { email, password })
            .send()
            .await
            .with_context(|| format!("Failed to POST to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err((status, error_text(response).await)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        Ok(Ok(SessionToken::new(body.token)))
    }
}

#[async_trait]
impl ScoringService for HttpScoringService {
    async fn authenticate(&self, email: &str, password: &str) -> Result<SessionToken, AppError> {
        match self.post_credentials(LOGIN_ENDPOINT, email, password).await? {
            Ok(token) => Ok(token),
            Err((status, text)) if status.is_client_error() => {
                warn!("Login rejected ({}): {}", status, text.unwrap_or_default());
                Err(AppError::InvalidCredentials)
            }
            Err((status, text)) => Err(AppError::Internal(anyhow::anyhow!(
                "Login failed with status {status}: {}",
                text.unwrap_or_else(|| "Login failed".to_string())
            ))),
        }
    }

    async fn signup(&self, email: &str, password: &str) -> Result<SessionToken, AppError> {
        match self.post_credentials(SIGNUP_ENDPOINT, email, password).await? {
            Ok(token) => Ok(token),
            Err((status, text)) => {
                warn!("Sign-up rejected ({})", status);
                Err(AppError::SignupRejected(
                    text.unwrap_or_else(|| "Signup failed".to_string()),
                ))
            }
        }
    }

    async fn analyze(
        &self,
        resume: &DraftInput,
        job_description: &DraftInput,
        token: &SessionToken,
    ) -> Result<Value, AppError> {
        let url = self.url(ANALYZE_ENDPOINT);
        let form = analyze_form(resume, job_description)?;

        info!("Calling scoring service: POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token.bearer_header())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::AnalysisFailed(format!("request failed: {e}")))?;

        let status = response.status();
        debug!("Analyze response status: {}", status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }

        if !status.is_success() {
            let text = error_text(response)
                .await
                .unwrap_or_else(|| format!("service returned {status}"));
            return Err(AppError::AnalysisFailed(text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::AnalysisFailed(format!("failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::MalformedPayload(format!("response is not JSON: {e}")))
    }

    async fn chat(&self, question: &str, report: &MatchReport) -> Result<String, AppError> {
        let url = self.url(CHAT_ENDPOINT);
        info!("Calling scoring service: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                question,
                analysis: report,
            })
            .send()
            .await
            .map_err(|e| AppError::ChatFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = error_text(response)
                .await
                .unwrap_or_else(|| format!("service returned {status}"));
            return Err(AppError::ChatFailed(text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::ChatFailed(format!("unreadable response: {e}")))?;

        body.answer
            .ok_or_else(|| AppError::ChatFailed("response has no answer".to_string()))
    }
}

/// Text fields are always sent (empty for a file slot) so the service can
/// fall back to them; a file slot adds its document part.
fn analyze_form(resume: &DraftInput, job_description: &DraftInput) -> Result<Form, AppError> {
    let mut form = Form::new()
        .text("resume_text", resume.as_text().unwrap_or_default().to_string())
        .text("job_text", job_description.as_text().unwrap_or_default().to_string());

    if let Some(file) = resume.as_file() {
        form = form.part("resume", file_part(file)?);
    }
    if let Some(file) = job_description.as_file() {
        form = form.part("job", file_part(file)?);
    }
    Ok(form)
}

fn file_part(file: &UploadFile) -> Result<Part, AppError> {
    Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name.clone())
        .mime_str(file.content_type)
        .map_err(|e| AppError::Validation(format!("Invalid upload {}: {e}", file.file_name)))
}

/// Pulls the human-readable message out of an error response, if any.
async fn error_text(response: Response) -> Option<String> {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ServiceError>(&body) {
        Ok(err) => err.text(),
        Err(_) if !body.trim().is_empty() => Some(body),
        Err(_) => None,
    }
}
