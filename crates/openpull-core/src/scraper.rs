use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{FlexibleScraperError, ScrapeError, Stage};
use crate::extract::ExtractionClient;
use crate::parse::parse_response;
use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;
use crate::schema::ExtractionSchema;
use crate::traits::{CompletionProvider, Fetcher, Normalizer};

/// Per-invocation time limits for the I/O stages.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Bounds the fetch stage.
    pub fetch_timeout: Duration,
    /// Bounds the extract stage as a whole, retries included.
    pub extract_timeout: Duration,
}

impl ScraperConfig {
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(60),
            extract_timeout: Duration::from_secs(300),
        }
    }
}

/// Orchestrates the full extraction pipeline: fetch → normalize → prompt →
/// extract → parse.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP or LLM calls. Each call to
/// [`scrape`](FlexibleScraper::scrape) is an independent unit of work: the
/// scraper holds no per-request state, so one instance (or clones of it) can
/// serve any number of concurrent invocations.
#[derive(Clone)]
pub struct FlexibleScraper<F, N, P>
where
    F: Fetcher,
    N: Normalizer,
    P: CompletionProvider,
{
    fetcher: F,
    normalizer: N,
    client: ExtractionClient<P>,
    prompt_builder: PromptBuilder,
    config: ScraperConfig,
}

impl<F, N, P> FlexibleScraper<F, N, P>
where
    F: Fetcher,
    N: Normalizer,
    P: CompletionProvider,
{
    pub fn new(fetcher: F, normalizer: N, provider: P) -> Self {
        Self {
            fetcher,
            normalizer,
            client: ExtractionClient::new(provider),
            prompt_builder: PromptBuilder::new(),
            config: ScraperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.client = self.client.with_policy(policy);
        self
    }

    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt_builder = builder;
        self
    }

    /// Run the full pipeline for one page.
    ///
    /// 1. Fetch the page
    /// 2. Normalize markup to bounded plain text
    /// 3. Build the model prompt from instruction + content + schema
    /// 4. Call the model (with retries on transient failures)
    /// 5. Parse and validate the response
    ///
    /// Fetch failures are terminal: a page that cannot be fetched is never
    /// retried and the model is never called for it. Every failure names the
    /// stage it occurred in.
    pub async fn scrape(
        &self,
        url: &str,
        instruction: &str,
        schema: Option<&ExtractionSchema>,
    ) -> Result<Map<String, Value>, FlexibleScraperError> {
        self.scrape_with_cancel(url, instruction, schema, &CancellationToken::new())
            .await
    }

    /// Like [`scrape`](FlexibleScraper::scrape), but races every stage
    /// against the given token. Cancelling the token aborts this invocation
    /// only; the error names the stage that was in flight.
    pub async fn scrape_with_cancel(
        &self,
        url: &str,
        instruction: &str,
        schema: Option<&ExtractionSchema>,
        cancel: &CancellationToken,
    ) -> Result<Map<String, Value>, FlexibleScraperError> {
        // 1. Fetch
        ensure_live(Stage::Fetch, cancel)?;
        tracing::info!("Fetching {}", url);
        let html = run_stage(
            Stage::Fetch,
            cancel,
            self.config.fetch_timeout,
            self.fetcher.fetch(url),
        )
        .await?;
        tracing::info!("Fetched {} bytes", html.len());

        // 2. Normalize
        ensure_live(Stage::Normalize, cancel)?;
        let content = self
            .normalizer
            .normalize(&html)
            .map_err(|e| FlexibleScraperError::new(Stage::Normalize, e))?;
        tracing::info!(
            "Normalized to {} chars ({}% reduction)",
            content.len(),
            if html.is_empty() {
                0
            } else {
                100usize.saturating_sub(content.len() * 100 / html.len())
            }
        );

        // 3. Prompt
        ensure_live(Stage::Prompt, cancel)?;
        let prompt = self.prompt_builder.build(instruction, &content, schema);

        // 4. Extract
        tracing::info!("Extracting ({} prompt chars)", prompt.len_chars());
        let raw = run_stage(
            Stage::Extract,
            cancel,
            self.config.extract_timeout,
            self.client.extract(&prompt),
        )
        .await?;

        // 5. Parse
        ensure_live(Stage::Parse, cancel)?;
        let data = parse_response(&raw, schema)
            .map_err(|e| FlexibleScraperError::new(Stage::Parse, e))?;
        tracing::info!(fields = data.len(), "Extraction complete");

        Ok(data)
    }
}

fn ensure_live(stage: Stage, cancel: &CancellationToken) -> Result<(), FlexibleScraperError> {
    if cancel.is_cancelled() {
        Err(FlexibleScraperError::new(stage, ScrapeError::Cancelled))
    } else {
        Ok(())
    }
}

/// Run one pipeline stage under its time budget, racing cancellation.
async fn run_stage<T>(
    stage: Stage,
    cancel: &CancellationToken,
    limit: Duration,
    work: impl Future<Output = Result<T, ScrapeError>>,
) -> Result<T, FlexibleScraperError> {
    tokio::select! {
        () = cancel.cancelled() => Err(FlexibleScraperError::new(stage, ScrapeError::Cancelled)),
        outcome = tokio::time::timeout(limit, work) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(FlexibleScraperError::new(stage, e)),
            Err(_) => Err(FlexibleScraperError::new(
                stage,
                ScrapeError::Timeout(limit.as_secs()),
            )),
        },
    }
}
