pub mod error;
pub mod extract;
pub mod parse;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod scraper;
pub mod testutil;
pub mod traits;

pub use error::{FlexibleScraperError, ScrapeError, Stage};
pub use extract::ExtractionClient;
pub use parse::parse_response;
pub use prompt::{ModelPrompt, PromptBuilder};
pub use retry::RetryPolicy;
pub use schema::{ExtractionSchema, FieldKind, FieldSpec};
pub use scraper::{FlexibleScraper, ScraperConfig};
pub use traits::{CompletionProvider, Fetcher, Normalizer};
