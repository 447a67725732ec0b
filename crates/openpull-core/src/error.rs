use std::fmt;

use thiserror::Error;

/// Errors raised by individual pipeline components.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Page fetch failed. `status` carries the HTTP status when the server
    /// answered at all; pure network failures leave it `None`.
    #[error("fetch failed: {message}")]
    Fetch {
        status: Option<u16>,
        message: String,
    },

    /// Markup-to-text conversion failed.
    #[error("normalize failed: {0}")]
    Normalize(String),

    /// Credential rejected by the model provider. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider rate limit hit (HTTP 429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Network-level failure (connect, reset, DNS).
    #[error("network error: {0}")]
    Transient(String),

    /// Request exceeded its time budget.
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    /// Failure reported by the provider itself (error payload, empty
    /// completion, malformed request). Terminal for the request.
    #[error("model error (HTTP {status}): {message}")]
    Model { status: u16, message: String },

    /// Model output contained no decodable JSON object.
    #[error("parse failed: {message}")]
    Parse {
        message: String,
        /// The offending raw output, kept for diagnosis.
        raw: String,
    },

    /// Decoded output does not satisfy the declared schema.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// The invocation was cancelled by its caller.
    #[error("scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// True if this error is transient and worth another attempt.
    ///
    /// Fetch failures are deliberately excluded: the fetch layer performs
    /// no retries and the orchestrator treats them as terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::RateLimited | ScrapeError::Transient(_) | ScrapeError::Timeout(_)
        )
    }
}

/// Pipeline stage names attached to every error surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    Prompt,
    Extract,
    Parse,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Prompt => "prompt",
            Stage::Extract => "extract",
            Stage::Parse => "parse",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single error type a `scrape` call can return.
///
/// Wraps the component error with the stage it arose in, so callers can
/// tell "could not reach the page" from "the model could not extract"
/// without matching on every inner variant.
#[derive(Error, Debug)]
#[error("scrape failed at {stage} stage: {source}")]
pub struct FlexibleScraperError {
    stage: Stage,
    #[source]
    source: ScrapeError,
}

impl FlexibleScraperError {
    pub fn new(stage: Stage, source: ScrapeError) -> Self {
        Self { stage, source }
    }

    /// The pipeline stage the failure originated in.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The underlying component error.
    pub fn cause(&self) -> &ScrapeError {
        &self.source
    }

    /// True if retrying the whole `scrape` call later could succeed.
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    pub fn into_cause(self) -> ScrapeError {
        self.source
    }
}
