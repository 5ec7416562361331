// src/fetch/mod.rs
// =============================================================================
// The fetch provider contract used by the crawler.
//
// The crawler never talks HTTP or parses HTML itself. It asks a Downloader for
// a Document and asks that Document for its outbound links. Both calls may be
// slow; timeouts are the provider's business.
//
// Submodules:
// - http: Downloader backed by reqwest
// - html: Document that pulls <a href> links out of HTML
// - markdown: Document that pulls links out of Markdown
// =============================================================================

mod html;
mod http;
mod markdown;

use async_trait::async_trait;

use crate::error::{ExtractError, FetchError};

pub use html::HtmlDocument;
pub use http::HttpDownloader;
pub use markdown::MarkdownDocument;

/// Turns a URL into a fetched [`Document`].
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError>;
}

/// A fetched page that can list the links it points to.
#[async_trait]
pub trait Document: Send + Sync {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}
