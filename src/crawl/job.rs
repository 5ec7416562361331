// src/crawl/job.rs
// =============================================================================
// The two kinds of work a crawl produces.
//
// - Download: fetch one URL through the Downloader, record the outcome, free
//   the host slot, and hand the document on to extraction.
// - Extract: ask a fetched document for its links and add them to the next
//   level's frontier.
//
// Both carry the LevelTicket of the URL they work on. The ticket moves from
// the download into the extraction, so a successful download only completes
// the level barrier once its extraction has finished.
//
// A running download also holds a HostSlot. Dropping it frees the host's
// admission slot, so a panicking or abandoned download still lets the next
// queued download of that host start.
// =============================================================================

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use super::host::HostAdmission;
use super::level::LevelTicket;
use super::pool::Pools;
use super::result::ResultAggregator;
use crate::config::CrawlRequest;
use crate::error::{ExtractError, FetchError};
use crate::fetch::{Document, Downloader};

/// State shared by every job of one crawl call.
pub(crate) struct CrawlContext {
    pub(crate) request: CrawlRequest,
    pub(crate) downloader: Arc<dyn Downloader>,
    pub(crate) results: ResultAggregator,
    pub(crate) hosts: HostAdmission<Job>,
    pub(crate) pools: Pools,
}

impl CrawlContext {
    /// Routes a download through host admission into the download pool.
    pub(crate) fn admit(&self, host: &str, job: Job) {
        if let Some(job) = self.hosts.submit(host, job) {
            self.pools.submit(job);
        }
    }

    /// Frees one running slot of `host`, starting its next queued download.
    fn release(&self, host: &str) {
        if let Some(next) = self.hosts.completed(host) {
            self.pools.submit(next);
        }
    }
}

pub(crate) enum Job {
    Download(DownloadJob),
    Extract(ExtractJob),
}

impl Job {
    pub(crate) fn download(
        url: String,
        host: String,
        ctx: Arc<CrawlContext>,
        ticket: LevelTicket,
    ) -> Self {
        Job::Download(DownloadJob {
            url,
            host,
            ctx,
            ticket,
        })
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Job::Download(_) => "download",
            Job::Extract(_) => "extract",
        }
    }

    pub(crate) fn url(&self) -> &str {
        match self {
            Job::Download(job) => &job.url,
            Job::Extract(job) => &job.url,
        }
    }

    pub(crate) async fn run(self) {
        match self {
            Job::Download(job) => job.run().await,
            Job::Extract(job) => job.run().await,
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind())
            .field("url", &self.url())
            .finish()
    }
}

pub(crate) struct DownloadJob {
    url: String,
    host: String,
    ctx: Arc<CrawlContext>,
    ticket: LevelTicket,
}

impl DownloadJob {
    async fn run(self) {
        let DownloadJob {
            url,
            host,
            ctx,
            ticket,
        } = self;
        let slot = HostSlot {
            ctx: Arc::clone(&ctx),
            host,
        };

        // Excludes are checked again at execution time.
        if ctx.request.is_excluded(&url) {
            trace!(url = %url, "excluded at download time");
            return;
        }

        let outcome = AssertUnwindSafe(ctx.downloader.download(&url))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                warn!(url = %url, "downloader panicked");
                Err(FetchError::Other(format!(
                    "downloader panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });

        match outcome {
            Ok(document) => {
                ctx.results.record_download(&url);
                // The host slot is freed before extraction so a slow document
                // does not hold back other downloads from the same host.
                drop(slot);
                trace!(url = %url, depth = ticket.level().depth(), "downloaded");
                ctx.pools.submit(Job::Extract(ExtractJob {
                    url,
                    document,
                    ctx: Arc::clone(&ctx),
                    ticket,
                }));
            }
            Err(error) => {
                debug!(url = %url, error = %error, "download failed");
                ctx.results.record_error(&url, error.into());
            }
        }
    }
}

/// One running download's share of its host's admission limit.
struct HostSlot {
    ctx: Arc<CrawlContext>,
    host: String,
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        self.ctx.release(&self.host);
    }
}

pub(crate) struct ExtractJob {
    url: String,
    document: Box<dyn Document>,
    ctx: Arc<CrawlContext>,
    ticket: LevelTicket,
}

impl ExtractJob {
    async fn run(self) {
        let outcome = AssertUnwindSafe(self.document.extract_links())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                warn!(url = %self.url, "document panicked during link extraction");
                Err(ExtractError::Other(format!(
                    "document panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });

        match outcome {
            Ok(links) => {
                trace!(url = %self.url, links = links.len(), "links extracted");
                self.ticket.level().discover(links);
            }
            Err(error) => {
                debug!(url = %self.url, error = %error, "link extraction failed");
                self.ctx.results.record_error(&self.url, error.into());
            }
        }
        // Dropping `self` releases the ticket.
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
