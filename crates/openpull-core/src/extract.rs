use crate::error::ScrapeError;
use crate::prompt::ModelPrompt;
use crate::retry::RetryPolicy;
use crate::traits::CompletionProvider;

/// Drives the model call with bounded retries.
///
/// Wraps any [`CompletionProvider`] and re-issues the call on retryable
/// failures (rate limit, network, timeout) with the policy's backoff.
/// Fatal failures (bad credential, provider-reported model errors) are
/// surfaced immediately, and after the attempt cap the *last* error is
/// returned; the client never swallows a failure into empty output.
#[derive(Clone)]
pub struct ExtractionClient<P: CompletionProvider> {
    provider: P,
    policy: RetryPolicy,
}

impl<P: CompletionProvider> ExtractionClient<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send the prompt, retrying transient failures up to the attempt cap.
    pub async fn extract(&self, prompt: &ModelPrompt) -> Result<String, ScrapeError> {
        let mut attempt = 1u32;
        loop {
            match self.provider.complete(prompt).await {
                Ok(raw) => return Ok(raw),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
