// src/error.rs
// =============================================================================
// Error types for the crawler.
//
// Two kinds of failure exist:
// - Per-URL errors (CrawlError) are captured by the worker jobs and stored in
//   the crawl result. They never abort a crawl.
// - Call-level errors (ConfigError, CrawlerError) are returned from
//   Crawler::new and the crawl entry points.
//
// Per-URL errors are Clone + Serialize so a finished result can be handed out
// while late jobs still hold the shared aggregator, and printed as JSON.
// =============================================================================

use serde::Serialize;
use thiserror::Error;

/// Rejected crawler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("download pool size must be greater than 0, got {0}")]
    InvalidDownloaders(usize),

    #[error("extraction pool size must be greater than 0, got {0}")]
    InvalidExtractors(usize),

    #[error("per-host limit must be greater than 0, got {0}")]
    InvalidPerHost(usize),
}

/// Failure reported by a [`Downloader`](crate::fetch::Downloader).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("could not resolve hostname")]
    Dns,

    #[error("TLS certificate error")]
    Tls,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

/// Failure reported by [`Document::extract_links`](crate::fetch::Document::extract_links).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractError {
    #[error("invalid base URL: {0}")]
    InvalidBase(String),

    #[error("could not parse document: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Why a single URL ended up in the error map of a crawl result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum CrawlError {
    #[error("malformed URL: {reason}")]
    MalformedUrl { reason: String },

    #[error("fetch failed: {source}")]
    Fetch { source: FetchError },

    #[error("link extraction failed: {source}")]
    Extract { source: ExtractError },
}

impl From<FetchError> for CrawlError {
    fn from(source: FetchError) -> Self {
        CrawlError::Fetch { source }
    }
}

impl From<ExtractError> for CrawlError {
    fn from(source: ExtractError) -> Self {
        CrawlError::Extract { source }
    }
}

/// Failure of a whole crawl call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlerError {
    #[error("crawler has been closed")]
    Closed,
}
