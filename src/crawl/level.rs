// src/crawl/level.rs
// =============================================================================
// Per-level synchronization.
//
// Every unit of work dispatched at a BFS level carries a LevelTicket. The
// ticket travels from the download job into the extraction job (if any) and
// signals the level barrier when it is dropped, so each dispatched URL
// completes the barrier exactly once, whether it succeeded, failed, was
// filtered, or its job was abandoned during shutdown.
//
// Links found by extraction jobs are collected here and become the next
// level's frontier.
// =============================================================================

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub(crate) struct Level {
    depth: usize,
    pending: AtomicUsize,
    settled: Notify,
    discovered: DashSet<String>,
}

impl Level {
    pub(crate) fn new(depth: usize) -> Arc<Self> {
        Arc::new(Self {
            depth,
            ..Self::default()
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Registers one pending completion against this level.
    pub(crate) fn ticket(self: &Arc<Self>) -> LevelTicket {
        self.pending.fetch_add(1, Ordering::AcqRel);
        LevelTicket {
            level: Arc::clone(self),
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until every ticket handed out so far has been dropped.
    ///
    /// Only the coordinator waits, so `notify_one` is enough: a notification
    /// sent before we start waiting is stored as a permit.
    pub(crate) async fn settled(&self) {
        while self.pending() != 0 {
            self.settled.notified().await;
        }
    }

    pub(crate) fn discover<I>(&self, links: I)
    where
        I: IntoIterator<Item = String>,
    {
        for link in links {
            self.discovered.insert(link);
        }
    }

    /// Links discovered so far; after `settled` this is the next frontier.
    pub(crate) fn frontier(&self) -> HashSet<String> {
        self.discovered.iter().map(|link| link.key().clone()).collect()
    }

    fn arrive(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.settled.notify_one();
        }
    }
}

/// One pending completion of a level. Dropping it signals the barrier.
#[derive(Debug)]
pub(crate) struct LevelTicket {
    level: Arc<Level>,
}

impl LevelTicket {
    pub(crate) fn level(&self) -> &Level {
        &self.level
    }
}

impl Drop for LevelTicket {
    fn drop(&mut self) {
        self.level.arrive();
    }
}
