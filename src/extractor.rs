use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::io::Cursor;
use url::Url;

/// Minimum body length, in characters, for an article worth summarizing.
pub const MIN_BODY_CHARS: usize = 100;

static OG_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("Failed to parse og:title selector")
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub body_text: String,
}

impl ExtractedArticle {
    pub fn body_chars(&self) -> usize {
        self.body_text.chars().count()
    }

    pub fn is_long_enough(&self) -> bool {
        self.body_chars() >= MIN_BODY_CHARS
    }
}

/// Pulls the readable article out of an HTML document.
///
/// Returns `None` when the page has no recognizable article structure.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &Url) -> Option<ExtractedArticle>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityExtractor;

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &Url) -> Option<ExtractedArticle> {
        let mut cursor = Cursor::new(html.as_bytes());
        let product = match readability::extractor::extract(&mut cursor, url) {
            Ok(product) => product,
            Err(e) => {
                tracing::debug!(%url, "Readability extraction failed: {}", e);
                return None;
            }
        };

        let body_text = normalize_text(&product.text);
        if body_text.is_empty() {
            return None;
        }

        let title = non_blank(&product.title).or_else(|| fallback_title(html));

        Some(ExtractedArticle { title, body_text })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Title from `og:title`, then `<title>`.
fn fallback_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document
        .select(&OG_TITLE_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(non_blank)
        .or_else(|| {
            document
                .select(&TITLE_SELECTOR)
                .next()
                .and_then(|title| non_blank(&title.text().collect::<String>()))
        })
}

/// Trims every line and collapses runs of blank lines into one paragraph break.
pub fn normalize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_break = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            pending_break = !result.is_empty();
            continue;
        }
        if !result.is_empty() {
            result.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        result.push_str(trimmed);
        pending_break = false;
    }

    result
}
