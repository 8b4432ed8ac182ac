//! Bounded FIFO write queue between producers and the persistence writer.
//!
//! ```text
//! producer ─┐
//! producer ─┼─► WriteQueue::submit ──► [bounded crossbeam channel] ──► QueueReceiver::recv ──► writer
//! producer ─┘         (blocks when full)                                (None once closed + drained)
//! ```
//!
//! Closing is explicit rather than tied to dropping every sender: producer
//! handles may outlive the point where the lifecycle owner decides to stop,
//! and the writer must still see end-of-stream once the buffer is drained.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use dv_core::{DvError, SnapshotRecord};

use crate::client::CollectionHandle;

/// Reference queue capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One pending write: where to store it and what to store.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub target: CollectionHandle,
    pub record: SnapshotRecord,
}

/// Producer side of the queue. Clone one per producer.
#[derive(Clone)]
pub struct WriteQueue {
    tx: Sender<WriteRequest>,
    close_tx: Sender<()>,
    closed: Arc<AtomicBool>,
    capacity: usize,
}

/// Consumer side of the queue. Exactly one exists.
pub struct QueueReceiver {
    rx: Receiver<WriteRequest>,
    close_rx: Receiver<()>,
    closing: bool,
}

/// Create a queue holding at most `capacity` pending requests.
///
/// # Panics
///
/// Panics if `capacity` is zero; config validation rejects that earlier.
pub fn write_queue(capacity: usize) -> (WriteQueue, QueueReceiver) {
    assert!(capacity > 0, "write queue capacity must be at least 1");
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let (close_tx, close_rx) = crossbeam_channel::bounded(1);
    (
        WriteQueue { tx, close_tx, closed: Arc::new(AtomicBool::new(false)), capacity },
        QueueReceiver { rx, close_rx, closing: false },
    )
}

impl WriteQueue {
    /// Enqueue a request, blocking while the queue is full.
    ///
    /// Fails with [`DvError::ClosedQueue`] after [`close`](Self::close) or if
    /// the writer is gone. Either means the lifecycle was sequenced wrongly.
    pub fn submit(&self, request: WriteRequest) -> Result<(), DvError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DvError::ClosedQueue);
        }
        self.tx.send(request).map_err(|_| DvError::ClosedQueue)
    }

    /// Signal that no further submissions will occur.
    ///
    /// Already-buffered requests stay available to the writer. A second call
    /// returns [`DvError::ClosedQueue`].
    pub fn close(&self) -> Result<(), DvError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(DvError::ClosedQueue);
        }
        // Capacity 1 and a single successful swap: this never blocks. A
        // disconnected receiver means the writer already exited.
        let _ = self.close_tx.try_send(());
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Requests currently buffered.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl QueueReceiver {
    /// Next request in FIFO order.
    ///
    /// Blocks while the queue is empty and open. Returns `None` once the
    /// queue is closed (or every producer handle is dropped) and all
    /// buffered requests have been handed out.
    pub fn recv(&mut self) -> Option<WriteRequest> {
        if !self.closing {
            crossbeam_channel::select! {
                recv(self.rx) -> msg => return msg.ok(),
                recv(self.close_rx) -> _ => self.closing = true,
            }
        }
        self.rx.try_recv().ok()
    }

    /// Whether closure has been observed.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Requests currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
