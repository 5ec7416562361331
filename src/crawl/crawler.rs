// src/crawl/crawler.rs
// =============================================================================
// The crawler and its level coordinator.
//
// How a crawl works:
// 1. The frontier starts as the seed URL.
// 2. For each depth level, every new frontier URL is filtered (malformed,
//    host allowlist, exclude patterns), marked visited, and admitted for
//    download through its host's admission queue.
// 3. Downloads that succeed are handed to the extraction pool; the links
//    they yield are collected for the next level.
// 4. The coordinator waits until every URL of the level has settled, then
//    the collected links become the next frontier.
// 5. The loop ends at max depth, on an empty frontier, or when the crawl is
//    interrupted (the partial result is returned).
//
// One Crawler owns the worker pools and may run several crawls at once. Each
// crawl gets its own CrawlContext (host table, results), so crawls never see
// each other's state.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::host::{host_of, HostAdmission};
use super::job::{CrawlContext, Job};
use super::level::Level;
use super::pool::Pools;
use super::result::{CrawlResult, ResultAggregator};
use crate::config::{CrawlRequest, CrawlerConfig};
use crate::error::{ConfigError, CrawlerError};
use crate::fetch::Downloader;

/// Breadth-first crawler with per-host download limits.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use level_crawler::{Crawler, CrawlerConfig, HttpDownloader};
///
/// let downloader = Arc::new(HttpDownloader::new()?);
/// let crawler = Crawler::new(downloader, CrawlerConfig::new(8, 4, 2))?;
/// let result = crawler.crawl("https://example.com", 2).await?;
/// for url in &result.downloaded {
///     println!("{}", url);
/// }
/// crawler.close();
/// ```
pub struct Crawler {
    downloader: Arc<dyn Downloader>,
    config: CrawlerConfig,
    pools: Pools,
    shutdown: CancellationToken,
}

impl Crawler {
    /// Builds a crawler and starts its worker pools.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(downloader: Arc<dyn Downloader>, config: CrawlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let shutdown = CancellationToken::new();
        let pools = Pools::spawn(config.downloaders, config.extractors, shutdown.clone());
        info!(
            downloaders = config.downloaders,
            extractors = config.extractors,
            per_host = config.per_host,
            "crawler started"
        );
        Ok(Self {
            downloader,
            config,
            pools,
            shutdown,
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls from `url` down to `depth` levels with no filters.
    pub async fn crawl(&self, url: &str, depth: usize) -> Result<CrawlResult, CrawlerError> {
        self.crawl_with(CrawlRequest::new(url, depth), CancellationToken::new())
            .await
    }

    /// Crawls, silently skipping URLs that contain any of `excludes`.
    pub async fn crawl_excluding<S: AsRef<str>>(
        &self,
        url: &str,
        depth: usize,
        excludes: &[S],
    ) -> Result<CrawlResult, CrawlerError> {
        let request =
            CrawlRequest::new(url, depth).exclude(excludes.iter().map(|s| s.as_ref().to_string()));
        self.crawl_with(request, CancellationToken::new()).await
    }

    /// Crawls, only scheduling URLs whose host is in `hosts`.
    pub async fn crawl_restricted<S: AsRef<str>>(
        &self,
        url: &str,
        depth: usize,
        hosts: &[S],
    ) -> Result<CrawlResult, CrawlerError> {
        let request =
            CrawlRequest::new(url, depth).allow_hosts(hosts.iter().map(|s| s.as_ref().to_string()));
        self.crawl_with(request, CancellationToken::new()).await
    }

    /// Runs `request`. Cancelling `cancel` (or closing the crawler) stops the
    /// crawl at the current level and returns what was collected so far.
    pub async fn crawl_with(
        &self,
        request: CrawlRequest,
        cancel: CancellationToken,
    ) -> Result<CrawlResult, CrawlerError> {
        if self.is_closed() {
            return Err(CrawlerError::Closed);
        }

        let seed = request.url.clone();
        let max_depth = request.depth;
        let ctx = Arc::new(CrawlContext {
            request,
            downloader: Arc::clone(&self.downloader),
            results: ResultAggregator::default(),
            hosts: HostAdmission::new(self.config.per_host),
            pools: self.pools.clone(),
        });

        info!(seed = %seed, max_depth, "crawl started");
        let mut visited = HashSet::new();
        let mut frontier = HashSet::from([seed.clone()]);

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let level = Level::new(depth);
            let dispatched = dispatch(&ctx, &level, frontier, &mut visited);
            debug!(depth, dispatched, "level dispatched");

            let interrupted = tokio::select! {
                _ = level.settled() => false,
                _ = cancel.cancelled() => true,
                _ = self.shutdown.cancelled() => true,
            };
            if interrupted {
                warn!(depth, pending = level.pending(), "crawl interrupted, returning partial result");
                ctx.hosts.abandon();
                break;
            }

            frontier = level.frontier();
            info!(depth, dispatched, discovered = frontier.len(), "level finished");
        }

        let result = ctx.results.snapshot();
        info!(
            seed = %seed,
            downloaded = result.downloaded.len(),
            errors = result.errors.len(),
            "crawl finished"
        );
        Ok(result)
    }

    /// Stops both pools immediately. Running jobs are abandoned and later
    /// crawl calls fail with [`CrawlerError::Closed`]. Calling it again does
    /// nothing.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            info!("crawler closing");
            self.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pools.is_shut_down()
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        self.close();
    }
}

// Schedules every not-yet-visited frontier URL and returns how many downloads
// were admitted.
fn dispatch(
    ctx: &Arc<CrawlContext>,
    level: &Arc<Level>,
    frontier: HashSet<String>,
    visited: &mut HashSet<String>,
) -> usize {
    let mut dispatched = 0;
    for url in frontier {
        if visited.contains(&url) {
            continue;
        }

        let host = match host_of(&url) {
            Ok(host) => host,
            Err(error) => {
                debug!(url = %url, error = %error, "malformed URL");
                ctx.results.record_error(&url, error);
                visited.insert(url);
                continue;
            }
        };

        if !ctx.request.is_host_allowed(&host) {
            trace!(url = %url, host = %host, "host not allowed");
            continue;
        }

        visited.insert(url.clone());
        if ctx.request.is_excluded(&url) {
            trace!(url = %url, "excluded");
            continue;
        }

        let job = Job::download(url, host.clone(), Arc::clone(ctx), level.ticket());
        ctx.admit(&host, job);
        dispatched += 1;
    }
    dispatched
}
