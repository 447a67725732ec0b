use std::sync::Arc;

use htmd::HtmlToMarkdown;
use openpull_core::error::ScrapeError;
use openpull_core::traits::Normalizer;

/// Character budget applied to normalized content before prompting.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 40_000;

/// HTML-to-text normalizer using htmd.
///
/// Converts raw HTML into Markdown-flavored plain text, stripping
/// non-content elements (script, style, nav, etc.) to minimize model token
/// usage, then collapses whitespace and head-truncates to the character
/// budget. Oversized input is never an error. Non-HTML input passes through
/// as text.
pub struct HtmdNormalizer {
    converter: Arc<HtmlToMarkdown>,
    max_chars: usize,
}

impl Clone for HtmdNormalizer {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
            max_chars: self.max_chars,
        }
    }
}

impl HtmdNormalizer {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
            max_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    /// Override the character budget.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }
}

impl Default for HtmdNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for HtmdNormalizer {
    fn normalize(&self, raw: &str) -> Result<String, ScrapeError> {
        let markdown = self
            .converter
            .convert(raw)
            .map_err(|e| ScrapeError::Normalize(e.to_string()))?;
        let tidied = tidy_whitespace(&markdown);
        Ok(truncate_chars(&tidied, self.max_chars).to_string())
    }
}

/// Trim trailing whitespace per line and collapse runs of blank lines down
/// to a single blank line. Idempotent.
fn tidy_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.trim_start().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

/// Head-truncate to at most `max_chars` characters. Idempotent, and always
/// cuts at a character boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_html_to_text() {
        let normalizer = HtmdNormalizer::new();
        let html = "<h1>Hello</h1><p>World</p>";
        let text = normalizer.normalize(html).unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
    }

    #[test]
    fn strips_script_and_style() {
        let normalizer = HtmdNormalizer::new();
        let html = "<p>Content</p><script>alert('xss')</script><style>p{color:red}</style>";
        let text = normalizer.normalize(html).unwrap();
        assert!(text.contains("Content"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn strips_navigation_chrome() {
        let normalizer = HtmdNormalizer::new();
        let html =
            "<nav>Menu Item</nav><p>Article body</p><footer>Copyright notice</footer>";
        let text = normalizer.normalize(html).unwrap();
        assert!(text.contains("Article body"));
        assert!(!text.contains("Menu Item"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn normalization_is_deterministic() {
        let normalizer = HtmdNormalizer::new();
        let html = "<h1>Title</h1><p>Some <b>bold</b> text.</p>";
        let first = normalizer.normalize(html).unwrap();
        let second = normalizer.normalize(html).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn output_never_exceeds_the_budget() {
        let normalizer = HtmdNormalizer::new().with_max_chars(100);
        let html = format!("<p>{}</p>", "word ".repeat(200));
        let text = normalizer.normalize(&html).unwrap();
        assert!(text.chars().count() <= 100);
    }

    #[test]
    fn short_content_is_untouched_by_the_budget() {
        let normalizer = HtmdNormalizer::new().with_max_chars(10_000);
        let text = normalizer.normalize("<p>short</p>").unwrap();
        assert_eq!(text, "short");
    }

    #[test]
    fn truncation_is_idempotent() {
        let text = "abcdefghij".repeat(50);
        let once = truncate_chars(&text, 123);
        let twice = truncate_chars(once, 123);
        assert_eq!(once, twice);
        assert_eq!(once.chars().count(), 123);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld ".repeat(100);
        let cut = truncate_chars(&text, 50);
        assert_eq!(cut.chars().count(), 50);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn tidy_collapses_blank_runs() {
        let messy = "first\n\n\n\nsecond   \n\nthird\n\n\n";
        let tidied = tidy_whitespace(messy);
        assert_eq!(tidied, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn tidy_is_idempotent() {
        let messy = "  \n\na\n\n\n\nb  \nc\n\n";
        let once = tidy_whitespace(messy);
        let twice = tidy_whitespace(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalized_output_is_a_fixed_point() {
        let normalizer = HtmdNormalizer::new().with_max_chars(80);
        let html = format!("<p>{}</p><p>{}</p>", "alpha ".repeat(30), "beta ".repeat(30));
        let out = normalizer.normalize(&html).unwrap();
        let tidied = tidy_whitespace(&out);
        let again = truncate_chars(&tidied, 80);
        assert_eq!(again, out);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let normalizer = HtmdNormalizer::new();
        assert_eq!(normalizer.normalize("").unwrap(), "");
    }
}
