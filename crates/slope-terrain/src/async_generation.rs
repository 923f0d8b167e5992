//! Background ride generation on a dedicated worker thread.
//!
//! The whole [`RideSession`] is moved onto one named thread; the host submits
//! chunk requests over a bounded channel and collects finished chunks from a
//! second one. Only [`GeneratedChunk`] values cross back.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, never};
use dashmap::DashMap;

use crate::ride::{GeneratedChunk, RideConfig, RideSession};

/// Errors surfaced by [`RideWorker`].
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn ride worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ride worker request queue is full")]
    QueueFull,
    #[error("ride worker has shut down")]
    Disconnected,
}

/// Identifies one chunk request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A finished chunk together with the request it answers.
#[derive(Debug)]
pub struct CompletedChunk {
    pub ticket: Ticket,
    pub chunk: GeneratedChunk,
}

/// Internal wrapper that carries the ticket and its cancellation flag.
struct ChunkRequest {
    ticket: Ticket,
    cancelled: Arc<AtomicBool>,
}

/// Generates one ride's chunks on a background thread.
///
/// Requests are served strictly in submission order; each one that is not
/// cancelled before it starts advances the ride by exactly one chunk.
pub struct RideWorker {
    /// Sender for chunk requests. Dropped on shutdown to stop the thread.
    request_sender: Option<Sender<ChunkRequest>>,
    /// Receiver for finished chunks.
    result_receiver: Receiver<CompletedChunk>,
    /// Cancellation flag per queued request.
    queued: Arc<DashMap<Ticket, Arc<AtomicBool>>>,
    /// Requests queued or executing.
    in_flight: Arc<AtomicU64>,
    next_ticket: AtomicU64,
    handle: Option<JoinHandle<()>>,
}

impl RideWorker {
    /// Spawn the worker thread with its own [`RideSession`].
    ///
    /// - `queue_capacity`: maximum queued requests; excess submissions are rejected.
    /// - `result_capacity`: bounded channel capacity for finished chunks.
    pub fn new(
        config: RideConfig,
        queue_capacity: usize,
        result_capacity: usize,
    ) -> Result<Self, WorkerError> {
        let (request_sender, request_receiver) = bounded::<ChunkRequest>(queue_capacity.max(1));
        let (result_sender, result_receiver) = bounded::<CompletedChunk>(result_capacity.max(1));
        let queued: Arc<DashMap<Ticket, Arc<AtomicBool>>> = Arc::new(DashMap::new());
        let in_flight = Arc::new(AtomicU64::new(0));

        let session = RideSession::new(config);
        let handle = {
            let queued = Arc::clone(&queued);
            let in_flight = Arc::clone(&in_flight);
            std::thread::Builder::new()
                .name("ride-gen-worker".into())
                .spawn(move || {
                    run_worker(session, request_receiver, result_sender, queued, in_flight)
                })?
        };

        Ok(Self {
            request_sender: Some(request_sender),
            result_receiver,
            queued,
            in_flight,
            next_ticket: AtomicU64::new(0),
            handle: Some(handle),
        })
    }

    /// Queue a request for the next chunk of the ride.
    pub fn submit(&self) -> Result<Ticket, WorkerError> {
        let sender = self
            .request_sender
            .as_ref()
            .ok_or(WorkerError::Disconnected)?;
        let ticket = Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let cancelled = Arc::new(AtomicBool::new(false));
        self.queued.insert(ticket, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        sender
            .try_send(ChunkRequest { ticket, cancelled })
            .map(|()| ticket)
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.queued.remove(&ticket);
                match e {
                    TrySendError::Full(_) => {
                        tracing::warn!(%ticket, "ride worker queue full, request dropped");
                        WorkerError::QueueFull
                    }
                    TrySendError::Disconnected(_) => WorkerError::Disconnected,
                }
            })
    }

    /// Cancel a request that has not started yet.
    ///
    /// Returns `true` if the request was still queued. A request that already
    /// started is delivered as usual.
    pub fn cancel(&self, ticket: Ticket) -> bool {
        match self.queued.remove(&ticket) {
            Some((_, cancelled)) => {
                cancelled.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Drain all finished chunks without blocking.
    pub fn drain_results(&self) -> Vec<CompletedChunk> {
        self.result_receiver.try_iter().collect()
    }

    /// Wait up to `timeout` for the next finished chunk.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<CompletedChunk>, WorkerError> {
        match self.result_receiver.recv_timeout(timeout) {
            Ok(done) => Ok(Some(done)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Number of requests currently in flight (queued or executing).
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if the request is queued and has not started.
    pub fn is_pending(&self, ticket: Ticket) -> bool {
        self.queued.contains_key(&ticket)
    }
}

impl Drop for RideWorker {
    /// Abandon the backlog and stop the worker thread.
    fn drop(&mut self) {
        for entry in self.queued.iter() {
            entry.value().store(true, Ordering::Relaxed);
        }
        self.queued.clear();
        self.request_sender.take();
        // Closing the result side makes a blocked `send` fail, which stops the loop.
        drop(std::mem::replace(&mut self.result_receiver, never()));
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("ride worker thread panicked");
        }
    }
}

fn run_worker(
    mut session: RideSession,
    requests: Receiver<ChunkRequest>,
    results: Sender<CompletedChunk>,
    queued: Arc<DashMap<Ticket, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
) {
    while let Ok(request) = requests.recv() {
        // Once removed, the request can no longer be cancelled.
        queued.remove(&request.ticket);
        if request.cancelled.load(Ordering::Relaxed) {
            tracing::debug!(ticket = %request.ticket, "skipping cancelled chunk request");
            in_flight.fetch_sub(1, Ordering::Relaxed);
            continue;
        }

        let chunk = session.generate_next_chunk();
        let delivered = results
            .send(CompletedChunk {
                ticket: request.ticket,
                chunk,
            })
            .is_ok();
        in_flight.fetch_sub(1, Ordering::Relaxed);
        if !delivered {
            tracing::warn!(ticket = %request.ticket, "result channel closed, stopping ride worker");
            break;
        }
    }
}
