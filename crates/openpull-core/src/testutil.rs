//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::error::ScrapeError;
use crate::prompt::ModelPrompt;
use crate::traits::{CompletionProvider, Fetcher, Normalizer};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, ScrapeError>>>>,
    /// URLs requested so far, in order.
    pub requested: Arc<Mutex<Vec<String>>>,
    hang: bool,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(html.to_string())])),
            requested: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    pub fn with_error(error: ScrapeError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
            requested: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    pub fn with_responses(responses: Vec<Result<String, ScrapeError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    /// Fetcher that never completes, for timeout and cancellation tests.
    pub fn hanging() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requested: Arc::new(Mutex::new(Vec::new())),
            hang: true,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.hang {
            std::future::pending::<()>().await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockNormalizer
// ---------------------------------------------------------------------------

/// Mock normalizer that applies a simple transformation.
#[derive(Clone)]
pub struct MockNormalizer {
    error: Arc<Mutex<Option<ScrapeError>>>,
}

impl MockNormalizer {
    /// Creates a normalizer that returns the input unchanged.
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a normalizer that returns an error.
    pub fn with_error(error: ScrapeError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Normalizer for MockNormalizer {
    fn normalize(&self, raw: &str) -> Result<String, ScrapeError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Mock completion provider that returns configurable raw model output.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<String, ScrapeError>>>>,
    /// Prompts received so far, in order.
    pub prompts: Arc<Mutex<Vec<ModelPrompt>>>,
    hang: bool,
}

impl MockProvider {
    pub fn new(raw: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(raw.to_string())])),
            prompts: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    pub fn with_error(error: ScrapeError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
            prompts: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    pub fn with_responses(responses: Vec<Result<String, ScrapeError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    /// Provider that never completes, for timeout and cancellation tests.
    pub fn hanging() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            hang: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl CompletionProvider for MockProvider {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ScrapeError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("{}".to_string())
        } else {
            responses.remove(0)
        }
    }
}
