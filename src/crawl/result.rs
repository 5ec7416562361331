// src/crawl/result.rs
// =============================================================================
// Result aggregation.
//
// Worker jobs report into a ResultAggregator from many threads at once. It is
// purely additive: successes are appended in arrival order, errors are keyed
// by URL. Once the coordinator is done it takes a CrawlResult snapshot.
// =============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use dashmap::DashMap;
use serde::Serialize;

use crate::error::CrawlError;

/// Outcome of one crawl.
///
/// A URL whose fetch succeeded but whose link extraction failed shows up in
/// both `downloaded` and `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlResult {
    /// Successfully downloaded URLs, in the order downloads finished
    pub downloaded: Vec<String>,
    /// URLs that could not be processed, with the reason
    pub errors: HashMap<String, CrawlError>,
}

impl CrawlResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResultAggregator {
    downloaded: Mutex<Vec<String>>,
    errors: DashMap<String, CrawlError>,
}

impl ResultAggregator {
    pub(crate) fn record_download(&self, url: &str) {
        // A poisoned lock only means another job panicked mid-push; the Vec is still valid.
        let mut downloaded = self
            .downloaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        downloaded.push(url.to_string());
    }

    pub(crate) fn record_error(&self, url: &str, error: CrawlError) {
        self.errors.insert(url.to_string(), error);
    }

    pub(crate) fn snapshot(&self) -> CrawlResult {
        let downloaded = self
            .downloaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let errors = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        CrawlResult { downloaded, errors }
    }
}
