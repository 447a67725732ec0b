pub mod fetcher;
pub mod llm;
pub mod normalizer;

pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiProvider;
pub use normalizer::{DEFAULT_MAX_CONTENT_CHARS, HtmdNormalizer};

pub use openpull_core::{
    ExtractionSchema, FieldKind, FlexibleScraper, FlexibleScraperError, RetryPolicy, ScrapeError,
    ScraperConfig, Stage,
};

/// The fully wired scraper: reqwest fetcher, htmd normalizer,
/// OpenAI-compatible provider.
pub type DefaultScraper = FlexibleScraper<ReqwestFetcher, HtmdNormalizer, OpenAiProvider>;

/// Build a ready-to-use scraper from an API key, with default settings
/// everywhere else.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let scraper = openpull_client::flexible_scraper("sk-...")?;
/// let data = scraper
///     .scrape(
///         "https://example.com",
///         "Extract the main heading and any paragraph text",
///         None,
///     )
///     .await?;
/// println!("{}", serde_json::to_string_pretty(&data)?);
/// # Ok(())
/// # }
/// ```
pub fn flexible_scraper(api_key: &str) -> Result<DefaultScraper, ScrapeError> {
    let fetcher = ReqwestFetcher::new()?;
    let provider = OpenAiProvider::new(api_key)?;
    Ok(FlexibleScraper::new(
        fetcher,
        HtmdNormalizer::new(),
        provider,
    ))
}
