//! Bounded FIFO of pending messages with admission control.
//!
//! The sending half lives in the dispatcher, the receiving half is shared by
//! every worker. Admission rejects a post when `occupancy + margin` would
//! exceed the capacity; the push itself is a non-blocking `try_send`, so a
//! race past the check still fails with [`DispatchError::QueueFull`] rather
//! than blocking the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};

use crate::error::DispatchError;
use crate::message::Message;

/// Producer side: admission check, id assignment, push.
#[derive(Debug)]
pub struct RequestQueue {
    tx: mpsc::Sender<Message>,
    margin: usize,
    next_id: AtomicU64,
}

/// Consumer side, shared by all workers.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: Mutex<mpsc::Receiver<Message>>,
}

impl RequestQueue {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize, margin: usize) -> (Self, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            tx,
            margin,
            next_id: AtomicU64::new(0),
        };
        (queue, QueueReceiver { rx: Mutex::new(rx) })
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Messages pushed but not yet taken by a worker.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admit, number and enqueue a message. Returns the assigned id.
    pub fn push(&self, user_id: &str, question: &str) -> Result<u64, DispatchError> {
        if self.len() + self.margin > self.capacity() {
            return Err(DispatchError::QueueFull);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let msg = Message::new(id, user_id, question);
        match self.tx.try_send(msg) {
            Ok(()) => Ok(id),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }
}

impl QueueReceiver {
    /// Wait for the next message. `None` once every sender is gone.
    ///
    /// Cancel-safe: dropping the future never loses a message.
    pub async fn next(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }
}
