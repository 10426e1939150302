//! Probe pool: a fixed set of workers draining a FIFO of probe requests.
//!
//! At most `concurrency` probes (and so at most that many echo
//! subprocesses) run at once. Results go out over one unbounded channel in
//! completion order, so a single consumer sees them one at a time.
//!
//! Invariants:
//!   - every request a worker takes produces exactly one result
//!   - requests discarded by `cancel_all` produce none
//!   - `in_flight` is raised under the queue lock when a request is taken,
//!     so "queue empty and nothing in flight" is never observed mid-handoff

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use peerscout_core::config::ProbeConfig;
use peerscout_core::{ProbeRequest, ProbeResult};

use crate::cancel::CancellationToken;
use crate::probe::ProbeTask;

/// Receiving side of the pool's result channel. Yields `None` once the
/// pool has shut down and every result has been read.
pub type ResultReceiver = mpsc::UnboundedReceiver<ProbeResult>;

struct Shared {
    queue: Mutex<VecDeque<ProbeRequest>>,
    in_flight: AtomicUsize,
    closed: AtomicBool,
    /// Wakes workers when work arrives or the pool closes.
    work: Notify,
    /// Wakes `wait_idle` callers when the pool may have drained.
    idle: Notify,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<ProbeRequest>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_idle(&self) -> bool {
        let queue = self.queue();
        queue.is_empty() && self.in_flight.load(Ordering::Acquire) == 0
    }

    /// Take the next request, or `None` once the pool is closed and empty.
    async fn next_request(&self) -> Option<ProbeRequest> {
        loop {
            let notified = self.work.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queue = self.queue();
                if let Some(request) = queue.pop_front() {
                    self.in_flight.fetch_add(1, Ordering::AcqRel);
                    return Some(request);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }

            notified.await;
        }
    }
}

/// Lowers `in_flight` when a probe finishes, including when its worker is
/// aborted mid-probe.
struct InFlight<'a>(&'a Shared);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct ProbePool {
    shared: Arc<Shared>,
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl ProbePool {
    /// Start `config.workers()` workers on the current tokio runtime.
    pub fn new(config: ProbeConfig) -> (Self, ResultReceiver) {
        let concurrency = config.workers();
        let config = Arc::new(config);
        let token = CancellationToken::new();
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            work: Notify::new(),
            idle: Notify::new(),
        });
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let workers = (0..concurrency)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    shared.clone(),
                    config.clone(),
                    token.clone(),
                    result_tx.clone(),
                ))
            })
            .collect();

        tracing::info!(concurrency, program = %config.program, "probe pool started");

        (
            Self {
                shared,
                token,
                workers,
            },
            result_rx,
        )
    }

    /// Queue one probe. Returns immediately; the result arrives on the
    /// result channel.
    pub fn submit(&self, request: ProbeRequest) {
        tracing::trace!(peer = %request.peer.host, round = request.round, "probe queued");
        self.shared.queue().push_back(request);
        self.shared.work.notify_one();
    }

    /// Cancel the session: flag in-flight probes and drop everything still
    /// queued. Returns how many queued requests were discarded; those never
    /// produce a result.
    pub fn cancel_all(&self) -> usize {
        self.token.cancel();
        let discarded = {
            let mut queue = self.shared.queue();
            let n = queue.len();
            queue.clear();
            n
        };
        self.shared.idle.notify_waiters();
        tracing::info!(
            discarded,
            in_flight = self.in_flight(),
            "probe session cancelled"
        );
        discarded
    }

    /// Wait for the previous session to drain, then re-arm the token.
    pub async fn reset_for_new_session(&self) {
        self.wait_idle().await;
        self.token.reset_for_new_session();
        tracing::debug!("probe session reset");
    }

    /// Resolve once nothing is queued and nothing is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn queued(&self) -> usize {
        self.shared.queue().len()
    }

    /// Cancel outstanding work and wait for every worker to exit. After this
    /// returns no probe subprocess is alive and no further result is sent.
    pub async fn shutdown(mut self) {
        self.close();
        for worker in std::mem::take(&mut self.workers) {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "probe worker ended abnormally");
            }
        }
        tracing::info!("probe pool stopped");
    }

    fn close(&self) {
        self.cancel_all();
        self.shared.closed.store(true, Ordering::Release);
        self.shared.work.notify_waiters();
    }
}

impl Drop for ProbePool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        // Not shut down: abort workers. Dropping a running probe kills its child.
        self.close();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn worker_loop(
    worker: usize,
    shared: Arc<Shared>,
    config: Arc<ProbeConfig>,
    token: CancellationToken,
    results: mpsc::UnboundedSender<ProbeResult>,
) {
    tracing::trace!(worker, "probe worker started");

    while let Some(request) = shared.next_request().await {
        let _in_flight = InFlight(&shared);
        let result = ProbeTask::new(request, config.clone(), token.clone())
            .run()
            .await;
        if results.send(result).is_err() {
            tracing::debug!(worker, "result receiver dropped");
        }
    }

    tracing::trace!(worker, "probe worker exiting");
}
