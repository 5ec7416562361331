// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
// =============================================================================

use clap::Parser;

use level_crawler::{CrawlRequest, CrawlerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "level-crawler",
    version = "0.1.0",
    about = "Breadth-first web crawler with per-host download limits",
    long_about = "level-crawler walks the link graph of a website level by level, starting at a seed URL. \
                  Downloads are limited per host and link extraction runs on its own worker pool."
)]
pub struct Cli {
    /// URL to start crawling from (e.g., https://example.com)
    pub url: String,

    /// Number of link levels to crawl (0 = nothing, 1 = just the seed page)
    #[arg(long, default_value_t = 2)]
    pub depth: usize,

    /// Number of concurrent download workers
    #[arg(long, default_value_t = 1)]
    pub downloaders: usize,

    /// Number of concurrent link extraction workers
    #[arg(long, default_value_t = 1)]
    pub extractors: usize,

    /// Maximum concurrent downloads per host
    #[arg(long, default_value_t = 100)]
    pub per_host: usize,

    /// Skip URLs containing this substring (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Only crawl URLs on this host (repeatable)
    #[arg(long = "allow-host", value_name = "HOST")]
    pub allowed_hosts: Vec<String>,

    /// Output results in JSON format instead of plain text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig::new(self.downloaders, self.extractors, self.per_host)
    }

    pub fn crawl_request(&self) -> CrawlRequest {
        let request = CrawlRequest::new(self.url.clone(), self.depth).exclude(self.excludes.clone());
        if self.allowed_hosts.is_empty() {
            request
        } else {
            request.allow_hosts(self.allowed_hosts.clone())
        }
    }
}
