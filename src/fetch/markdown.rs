// src/fetch/markdown.rs
// =============================================================================
// Markdown documents.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Is a streaming parser, so nothing is kept around after extraction
//
// Relative destinations are resolved against the page URL, the same way the
// HTML document resolves its hrefs.
// =============================================================================

use async_trait::async_trait;
use pulldown_cmark::{Event, Parser, Tag};
use url::Url;

use super::html::resolve_link;
use super::Document;
use crate::error::ExtractError;

/// A downloaded Markdown file and the URL it was fetched from.
#[derive(Debug, Clone)]
pub struct MarkdownDocument {
    base_url: String,
    markdown: String,
}

impl MarkdownDocument {
    pub fn new(base_url: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            markdown: markdown.into(),
        }
    }
}

#[async_trait]
impl Document for MarkdownDocument {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        extract_markdown_links(&self.markdown, &self.base_url)
    }
}

// Extracts link destinations from Markdown text
//
// Example input:
//   "Check out [Rust](https://www.rust-lang.org) and [docs](./docs/)"
// with base "https://example.com/readme.md" gives
//   ["https://www.rust-lang.org/", "https://example.com/docs/"]
pub(crate) fn extract_markdown_links(
    markdown: &str,
    base_url: &str,
) -> Result<Vec<String>, ExtractError> {
    let base = Url::parse(base_url)
        .map_err(|e| ExtractError::InvalidBase(format!("{}: {}", base_url, e)))?;

    let links = Parser::new(markdown)
        .filter_map(|event| match event {
            // In pulldown-cmark 0.9, Link is Tag::Link(link_type, dest_url, title)
            Event::Start(Tag::Link(_link_type, dest_url, _title)) => {
                resolve_link(&base, &dest_url)
            }
            _ => None,
        })
        .collect();

    Ok(links)
}
