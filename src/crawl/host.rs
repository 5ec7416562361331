// src/crawl/host.rs
// =============================================================================
// Per-host admission control.
//
// At most `limit` downloads may run against one host at a time. Extra jobs
// wait in a FIFO queue owned by that host and are released one by one as
// running downloads finish.
//
// The host table is a DashMap so that unrelated hosts never contend on a
// single lock. All decisions about one host (admit or enqueue, pop or
// decrement, remove the entry once idle) happen while holding that host's
// entry, so an entry is only removed when it is idle *at that moment*. A
// submission racing with the removal either lands before it (and the entry
// stays) or after it (and starts a fresh entry): it can never attach to a
// discarded entry or slip past the limit.
//
// The structure does not run anything itself. `submit` and `completed` hand
// back the job that may start now and the caller routes it to a pool.
// =============================================================================

use std::collections::VecDeque;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use url::Url;

use crate::error::CrawlError;

#[derive(Debug)]
struct HostState<J> {
    running: usize,
    queue: VecDeque<J>,
}

impl<J> Default for HostState<J> {
    fn default() -> Self {
        Self {
            running: 0,
            queue: VecDeque::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct HostAdmission<J> {
    limit: usize,
    hosts: DashMap<String, HostState<J>>,
}

impl<J> HostAdmission<J> {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit,
            hosts: DashMap::new(),
        }
    }

    /// Admits `job` for `host`.
    ///
    /// Returns the job back if it may start right away; otherwise it is
    /// queued behind the host's running downloads and `None` is returned.
    pub(crate) fn submit(&self, host: &str, job: J) -> Option<J> {
        let mut state = self.hosts.entry(host.to_string()).or_default();
        if state.running < self.limit {
            state.running += 1;
            Some(job)
        } else {
            state.queue.push_back(job);
            None
        }
    }

    /// Releases one running slot of `host`.
    ///
    /// If a job is waiting, it takes over the slot and is returned. Otherwise
    /// the running count drops, and an idle host entry is removed in the same
    /// step.
    pub(crate) fn completed(&self, host: &str) -> Option<J> {
        match self.hosts.entry(host.to_string()) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                if let Some(next) = state.queue.pop_front() {
                    return Some(next);
                }
                state.running = state.running.saturating_sub(1);
                if state.running == 0 {
                    entry.remove();
                }
                None
            }
            // The table was abandoned while this download was running.
            Entry::Vacant(_) => None,
        }
    }

    /// Drops every queued job and forgets all hosts.
    pub(crate) fn abandon(&self) {
        self.hosts.clear();
    }

    #[cfg(test)]
    pub(crate) fn running(&self, host: &str) -> usize {
        self.hosts.get(host).map_or(0, |state| state.running)
    }

    #[cfg(test)]
    pub(crate) fn queued(&self, host: &str) -> usize {
        self.hosts.get(host).map_or(0, |state| state.queue.len())
    }

    #[cfg(test)]
    pub(crate) fn is_tracked(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }
}

/// Extracts the admission key (host name) of a URL.
pub(crate) fn host_of(url: &str) -> Result<String, CrawlError> {
    let parsed = Url::parse(url).map_err(|e| CrawlError::MalformedUrl {
        reason: e.to_string(),
    })?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| CrawlError::MalformedUrl {
            reason: format!("URL has no host: {}", url),
        })
}
