//! Per-sink backlog and worker task.
//!
//! Each sink drains its own bounded backlog. When the backlog is full the
//! oldest routine tick (a decision without a transition) makes room for the
//! newcomer, so phase changes and preemption events survive a slow sink.
//! Only a backlog made entirely of transitions turns a decision away.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DecisionSink, SignalDecision};

use crate::metrics::SinkMetrics;

/// What happened to a decision offered to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Queued behind the existing backlog
    Queued,
    /// Queued after evicting the oldest routine tick
    Displaced { evicted_tick: u64 },
    /// Turned away: the backlog holds only transitions, or the worker is gone
    Rejected,
}

#[derive(Debug)]
struct Backlog {
    pending: VecDeque<SignalDecision>,
    capacity: usize,
    closed: bool,
}

impl Backlog {
    fn push(&mut self, decision: SignalDecision) -> Offer {
        if self.closed {
            return Offer::Rejected;
        }
        if self.pending.len() < self.capacity {
            self.pending.push_back(decision);
            return Offer::Queued;
        }

        let routine = self.pending.iter().position(|d| d.transition.is_none());
        match routine.and_then(|index| self.pending.remove(index)) {
            Some(evicted) => {
                self.pending.push_back(decision);
                Offer::Displaced {
                    evicted_tick: evicted.tick,
                }
            }
            None => Offer::Rejected,
        }
    }
}

/// Backlog shared between a [`SinkHandle`] and its worker.
#[derive(Debug)]
struct SharedBacklog {
    backlog: Mutex<Backlog>,
    wake: Notify,
}

impl SharedBacklog {
    fn new(capacity: usize) -> Self {
        Self {
            backlog: Mutex::new(Backlog {
                pending: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            wake: Notify::new(),
        }
    }

    // a panicking sink never holds this lock, so a poisoned guard is still consistent
    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn offer(&self, decision: SignalDecision) -> (Offer, usize) {
        let mut backlog = self.lock();
        let offer = backlog.push(decision);
        let len = backlog.pending.len();
        drop(backlog);

        if offer != Offer::Rejected {
            self.wake.notify_one();
        }
        (offer, len)
    }

    /// Next decision, or `None` once closed and drained.
    async fn next(&self) -> Option<(SignalDecision, usize)> {
        loop {
            {
                let mut backlog = self.lock();
                if let Some(decision) = backlog.pending.pop_front() {
                    return Some((decision, backlog.pending.len()));
                }
                if backlog.closed {
                    return None;
                }
            }
            // notify_one leaves a permit when nobody waits, so a push between
            // the check above and this await is not missed
            self.wake.notified().await;
        }
    }

    fn close(&self) {
        self.lock().closed = true;
        self.wake.notify_one();
    }
}

/// Handle to one sink's backlog and worker task.
pub struct SinkHandle {
    name: String,
    backlog: Arc<SharedBacklog>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn a worker for `sink` with room for `queue_capacity` decisions.
    pub fn spawn<S: DecisionSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let backlog = Arc::new(SharedBacklog::new(queue_capacity.max(1)));
        let metrics = Arc::new(SinkMetrics::new(name.clone()));

        let worker = tokio::spawn(drain(
            sink,
            Arc::clone(&backlog),
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            backlog,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand a decision to the sink without waiting.
    pub fn offer(&self, decision: SignalDecision) -> Offer {
        let (offer, len) = self.backlog.offer(decision);
        self.metrics.set_queue_len(len);

        match offer {
            Offer::Queued => {}
            Offer::Displaced { evicted_tick } => {
                self.metrics.record_displaced();
                debug!(
                    sink = %self.name,
                    tick = decision.tick,
                    evicted_tick,
                    "backlog full, routine tick evicted"
                );
            }
            Offer::Rejected => {
                self.metrics.record_dropped();
                warn!(
                    sink = %self.name,
                    tick = decision.tick,
                    transition = ?decision.transition,
                    "sink backlog full of transitions, decision dropped"
                );
            }
        }
        offer
    }

    /// Stop accepting decisions, let the worker drain what is queued, then
    /// flush and close the sink.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        self.backlog.close();
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "sink worker panicked");
        }
    }
}

#[instrument(name = "sink_worker", skip(sink, backlog, metrics), fields(sink = %name))]
async fn drain<S: DecisionSink>(
    mut sink: S,
    backlog: Arc<SharedBacklog>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    while let Some((decision, remaining)) = backlog.next().await {
        metrics.set_queue_len(remaining);
        match sink.write(&decision).await {
            Ok(()) => metrics.record_written(decision.tick),
            Err(e) => {
                metrics.record_failed();
                error!(sink = %name, tick = decision.tick, error = %e, "sink write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "final flush failed");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "close failed");
    }
    debug!(sink = %name, written = metrics.write_count(), "sink worker drained");
}
