// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Breadth-first traversal, one depth level at a time
// - Per-host limit on concurrent downloads, with FIFO queues per host
// - Separate worker pools for downloading and for link extraction
// - Exclude patterns and an optional host allowlist
// - Interruption returns the partial result
//
// Submodules:
// - crawler: the Crawler type and the level coordinator
// - host: per-host admission control
// - job: download and extraction jobs
// - level: the per-level barrier and next-frontier collection
// - pool: fixed-size worker pools
// - result: thread-safe result aggregation
// =============================================================================

mod crawler;
mod host;
mod job;
mod level;
mod pool;
mod result;

pub use crawler::Crawler;
pub use result::CrawlResult;
