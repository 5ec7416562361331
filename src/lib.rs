// src/lib.rs
// =============================================================================
// level-crawler: a concurrent breadth-first web crawler.
//
// The crawler walks a link graph level by level from a seed URL, bounded by a
// maximum depth. Downloads go through a per-host admission queue into a fixed
// download pool; fetched documents go to a separate extraction pool.
//
// Modules:
// - crawl: the crawler, host admission, worker pools, results
// - fetch: the Downloader / Document contract and an HTTP implementation
// - config: crawler configuration and crawl requests
// - error: error types
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;

pub use config::{CrawlRequest, CrawlerConfig};
pub use crawl::{CrawlResult, Crawler};
pub use error::{ConfigError, CrawlError, CrawlerError, ExtractError, FetchError};
pub use fetch::{Document, Downloader, HtmlDocument, HttpDownloader, MarkdownDocument};

// Re-exported so callers can interrupt a crawl without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;
