// src/config.rs
// =============================================================================
// Crawler configuration.
//
// CrawlerConfig is fixed when a Crawler is built: it sizes the two worker
// pools and bounds how many downloads may run against one host at a time.
// CrawlRequest describes one traversal (seed, depth and URL filters).
// =============================================================================

use std::collections::HashSet;

use crate::error::ConfigError;

/// Pool sizes and the per-host concurrency limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Number of download workers
    pub downloaders: usize,
    /// Number of link extraction workers
    pub extractors: usize,
    /// Maximum number of downloads running at once for a single host
    pub per_host: usize,
}

impl CrawlerConfig {
    pub fn new(downloaders: usize, extractors: usize, per_host: usize) -> Self {
        Self {
            downloaders,
            extractors,
            per_host,
        }
    }

    /// Rejects zero-sized pools and a zero per-host limit, both of which would
    /// leave submitted work waiting forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.downloaders == 0 {
            return Err(ConfigError::InvalidDownloaders(self.downloaders));
        }
        if self.extractors == 0 {
            return Err(ConfigError::InvalidExtractors(self.extractors));
        }
        if self.per_host == 0 {
            return Err(ConfigError::InvalidPerHost(self.per_host));
        }
        Ok(())
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self::new(1, 1, 100)
    }
}

/// One traversal: where to start, how deep to go and what to skip.
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    pub url: String,
    pub depth: usize,
    /// URLs containing any of these substrings are skipped silently
    pub excludes: Vec<String>,
    /// When set, only URLs on these hosts are scheduled
    pub allowed_hosts: Option<HashSet<String>>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
            ..Self::default()
        }
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn allow_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts
            .get_or_insert_with(HashSet::new)
            .extend(hosts.into_iter().map(Into::into));
        self
    }

    pub(crate) fn is_excluded(&self, url: &str) -> bool {
        self.excludes.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    pub(crate) fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts
            .as_ref()
            .map_or(true, |hosts| hosts.contains(host))
    }
}
