use std::future::Future;

use crate::error::ScrapeError;
use crate::prompt::ModelPrompt;

/// Retrieves raw page content from an absolute http(s) URL.
///
/// Implementations perform no retries. A page that cannot be fetched is
/// terminal; retry policy lives with the model call.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}

/// Converts raw markup into bounded plain text fit for a model prompt.
///
/// Must truncate oversized input to its configured character budget rather
/// than fail, and must accept empty input (an empty page is the model's
/// problem, not the pipeline's).
pub trait Normalizer: Send + Sync + Clone {
    fn normalize(&self, raw: &str) -> Result<String, ScrapeError>;
}

/// The raw "send a prompt, receive completion text" capability of an LLM
/// provider. Stateless between calls: no conversation history is kept.
///
/// Implementations hold the provider credential and perform exactly one
/// network call per invocation; retry policy is layered on top by
/// [`ExtractionClient`](crate::extract::ExtractionClient).
pub trait CompletionProvider: Send + Sync + Clone {
    fn complete(
        &self,
        prompt: &ModelPrompt,
    ) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}
