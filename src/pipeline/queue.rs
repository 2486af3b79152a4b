//! Ingress queue: a bounded drop buffer between producers and the worker.
//!
//! Submissions never block the caller. When the queue is full, one entry is
//! dropped according to the configured overflow policy; retained entries
//! keep FIFO order. The worker side receives with a timeout so shutdown is
//! observed within one quantum.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::warn;

use crate::config::OverflowPolicy;
use crate::map::Map;

/// Outcome of a timed dequeue.
pub enum Dequeued {
    /// One pending map, in submission order.
    Entry(Map),
    /// Nothing arrived within the timeout.
    Empty,
    /// The queue was closed; the worker should exit.
    Closed,
}

/// Bounded single-consumer drop buffer of pending local maps.
pub struct IngressQueue {
    tx: Sender<Map>,
    rx: Receiver<Map>,
    policy: OverflowPolicy,
}

impl IngressQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx, policy }
    }

    /// Enqueue a map without ever blocking the caller.
    pub fn push(&self, map: Map) {
        match self.tx.try_send(map) {
            Ok(()) => {}
            Err(TrySendError::Full(map)) => match self.policy {
                OverflowPolicy::DropNewest => {
                    warn!("ingress queue full, dropping incoming map");
                }
                OverflowPolicy::DropOldest => {
                    warn!("ingress queue full, dropping oldest pending map");
                    let _ = self.rx.try_recv();
                    if self.tx.try_send(map).is_err() {
                        warn!("ingress queue still full, dropping incoming map");
                    }
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                warn!("ingress queue closed, dropping incoming map");
            }
        }
    }

    /// Dequeue one map, waiting at most `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Dequeued {
        match self.rx.recv_timeout(timeout) {
            Ok(map) => Dequeued::Entry(map),
            Err(RecvTimeoutError::Timeout) => Dequeued::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
