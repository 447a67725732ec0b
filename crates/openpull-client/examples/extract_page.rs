//! End-to-end extraction against a live page.
//!
//! ```sh
//! OPENPULL_API_KEY=sk-... cargo run --example extract_page
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use openpull_client::{ExtractionSchema, FieldKind, flexible_scraper};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("openpull=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let api_key = std::env::var("OPENPULL_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("OPENPULL_API_KEY (or OPENAI_API_KEY) not set")?;

    let scraper = flexible_scraper(&api_key)?;

    // Free-form extraction: shape is up to the model.
    let data = scraper
        .scrape(
            "https://example.com",
            "Extract the main heading and any paragraph text",
            None,
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&data)?);

    // Schema-guided extraction: declared fields come back as value or null.
    let schema = ExtractionSchema::new()
        .field("heading", FieldKind::String)
        .field("paragraphs", FieldKind::Array);
    let data = scraper
        .scrape(
            "https://example.com",
            "Extract the main heading and any paragraph text",
            Some(&schema),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&data)?);

    Ok(())
}
