// src/fetch/html.rs
// =============================================================================
// HTML documents.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Links are resolved against the page URL with the `url` crate, so the
// crawler always receives absolute http/https URLs without fragments.
// =============================================================================

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::Document;
use crate::error::ExtractError;

/// A downloaded HTML page and the URL it was fetched from.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    base_url: String,
    html: String,
}

impl HtmlDocument {
    pub fn new(base_url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl Document for HtmlDocument {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        // Parsing is CPU-bound and scraper's Html is not Send: it runs on the
        // blocking pool with owned copies of the page.
        let html = self.html.clone();
        let base_url = self.base_url.clone();
        tokio::task::spawn_blocking(move || extract_html_links(&html, &base_url))
            .await
            .map_err(|e| ExtractError::Other(format!("HTML parsing task failed: {}", e)))?
    }
}

// Extracts all crawlable links from HTML content
//
// Example:
//   html = "<a href='/docs#intro'>Docs</a>"
//   base_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub(crate) fn extract_html_links(html: &str, base_url: &str) -> Result<Vec<String>, ExtractError> {
    let base = Url::parse(base_url)
        .map_err(|e| ExtractError::InvalidBase(format!("{}: {}", base_url, e)))?;

    let selector =
        Selector::parse("a[href]").map_err(|e| ExtractError::Parse(e.to_string()))?;

    let document = Html::parse_document(html);

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(&base, href))
        .collect();

    Ok(links)
}

// Resolves a possibly-relative href against the page URL
//
// Returns None for in-page anchors, non-http schemes and unparseable hrefs.
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}
