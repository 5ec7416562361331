// src/crawl/pool.rs
// =============================================================================
// Fixed-size worker pools.
//
// A pool is `size` Tokio tasks pulling jobs from one shared channel. Each
// worker runs a single job at a time. The crawler owns two pools, one for
// downloads and one for link extraction, and `Pools` routes every job to the
// right one by matching on its kind.
//
// Shutdown is forceful: cancelling the token makes every worker abandon the
// job it is running and exit. Jobs still in the channel are dropped with it,
// which releases their level tickets.
// =============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::job::Job;

type JobReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Spawns `size` workers named `name` and returns the channel feeding them.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_pool(
    name: &'static str,
    size: usize,
    shutdown: CancellationToken,
) -> mpsc::UnboundedSender<Job> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let receiver: JobReceiver = Arc::new(Mutex::new(receiver));

    for id in 0..size {
        let receiver = Arc::clone(&receiver);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            worker_loop(name, id, receiver, shutdown).await;
        });
    }

    debug!(pool = name, size, "worker pool started");
    sender
}

async fn worker_loop(
    pool: &'static str,
    id: usize,
    receiver: JobReceiver,
    shutdown: CancellationToken,
) {
    loop {
        // Only one idle worker waits on the channel at a time; the rest wait
        // for the lock.
        let job = {
            let mut receiver = tokio::select! {
                _ = shutdown.cancelled() => break,
                guard = receiver.lock() => guard,
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                job = receiver.recv() => job,
            }
        };
        let Some(job) = job else { break };

        let kind = job.kind();
        let url = job.url().to_string();
        tokio::select! {
            _ = shutdown.cancelled() => {
                warn!(pool, worker = id, kind, url = %url, "job abandoned by shutdown");
                break;
            }
            outcome = AssertUnwindSafe(job.run()).catch_unwind() => {
                if outcome.is_err() {
                    error!(pool, worker = id, kind, url = %url, "job panicked");
                }
            }
        }
    }
    debug!(pool, worker = id, "worker stopped");
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc<Mutex<Receiver>>?
//    - An mpsc channel has exactly one receiver
//    - Wrapping it in Arc<Mutex<..>> lets several workers share it
//    - Whoever holds the lock takes the next job; the others wait their turn
//
// 2. What does tokio::select! do here?
//    - It races the job against the shutdown token
//    - When the token fires, the job future is dropped mid-flight
//    - Dropping a future is how async Rust cancels work
//
// 3. Why catch_unwind?
//    - A panicking job would otherwise end the worker task
//    - catch_unwind turns the panic into an Err, and the worker moves on
// -----------------------------------------------------------------------------

/// Routes jobs to the download or extraction pool.
#[derive(Debug, Clone)]
pub(crate) struct Pools {
    downloads: mpsc::UnboundedSender<Job>,
    extractions: mpsc::UnboundedSender<Job>,
    shutdown: CancellationToken,
}

impl Pools {
    pub(crate) fn spawn(downloaders: usize, extractors: usize, shutdown: CancellationToken) -> Self {
        Self {
            downloads: spawn_pool("download", downloaders, shutdown.clone()),
            extractions: spawn_pool("extract", extractors, shutdown.clone()),
            shutdown,
        }
    }

    /// Queues a job on its pool. After shutdown the job is dropped.
    pub(crate) fn submit(&self, job: Job) {
        if self.shutdown.is_cancelled() {
            debug!(kind = job.kind(), url = job.url(), "pools shut down, dropping job");
            return;
        }
        let channel = match &job {
            Job::Download(_) => &self.downloads,
            Job::Extract(_) => &self.extractions,
        };
        if let Err(rejected) = channel.send(job) {
            debug!(kind = rejected.0.kind(), url = rejected.0.url(), "pool closed, dropping job");
        }
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
