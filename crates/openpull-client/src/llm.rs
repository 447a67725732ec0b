use std::time::Duration;

use openpull_core::error::ScrapeError;
use openpull_core::prompt::ModelPrompt;
use openpull_core::traits::CompletionProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible completion provider.
///
/// Sends one chat completion per call and returns the completion text
/// verbatim; locating and decoding the JSON inside it is the parser's job.
/// Works with any OpenAI-compatible API, including:
/// - OpenAI directly (`https://api.openai.com/v1`)
/// - Gemini via compatibility layer (`https://generativelanguage.googleapis.com/v1beta/openai`)
///
/// The provider holds only the credential and connection pool. It keeps no
/// conversation history, so a single instance can serve concurrent,
/// unrelated extractions.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    pub fn new(api_key: &str) -> Result<Self, ScrapeError> {
        if api_key.trim().is_empty() {
            return Err(ScrapeError::Auth("API key must not be empty".into()));
        }
        Self::build(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL, DEFAULT_LLM_TIMEOUT)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Per-attempt request timeout. Rebuilds the HTTP client.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, ScrapeError> {
        Self::build(&self.api_key, &self.model, &self.base_url, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Transient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ScrapeError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScrapeError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ScrapeError::Transient(format!("connection failed: {e}"))
                } else {
                    ScrapeError::Transient(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}: {body}"));
            return Err(classify_status(status, message));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| ScrapeError::Model {
            status,
            message: format!("malformed completion response: {e}"),
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ScrapeError::Model {
                status,
                message: "empty completion".into(),
            })?;

        tracing::debug!(chars = content.len(), model = %self.model, "Completion received");
        Ok(content)
    }
}

/// Map a non-2xx provider status onto the error taxonomy. Rate limits and
/// server-side failures are retryable; credential and request errors are not.
fn classify_status(status: u16, message: String) -> ScrapeError {
    match status {
        401 | 403 => ScrapeError::Auth(message),
        429 => ScrapeError::RateLimited,
        500.. => ScrapeError::Transient(message),
        _ => ScrapeError::Model { status, message },
    }
}
