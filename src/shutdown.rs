//! Shutdown plumbing: a broadcast stop signal and a worker exit latch.
//!
//! Workers subscribe to [`ShutdownSignal`] when spawned and hold an
//! [`ExitGuard`] for their whole lifetime. `close` fires the signal and then
//! waits on the [`ExitLatch`] under a timer; whichever resolves first wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

/// One-shot stop signal fanned out to every worker.
///
/// Built on [`tokio::sync::broadcast`] so a single `fire` reaches every
/// subscriber without blocking, however many workers there are.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Only subscribers created before `fire` see the signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Returns the number of workers that will see it.
    pub fn fire(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown latch: starts at the worker count, each worker decrements once.
#[derive(Debug)]
pub struct ExitLatch {
    remaining: AtomicUsize,
    notify: Notify,
}

impl ExitLatch {
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Take one slot. The slot is released when the guard drops, including
    /// on panic or task abort.
    pub fn guard(self: &Arc<Self>) -> ExitGuard {
        ExitGuard {
            latch: Arc::clone(self),
        }
    }

    fn count_down(&self) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Resolves once the count reaches zero.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a count_down in between is not missed.
            notified.as_mut().enable();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait at most `timeout`. Returns `true` if every worker exited.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

/// Decrements its latch on drop.
#[derive(Debug)]
pub struct ExitGuard {
    latch: Arc<ExitLatch>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
