//! Lifecycle: open a worker pool, post questions to it, close it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Parameters;
use crate::error::DispatchError;
use crate::message::Callback;
use crate::queue::RequestQueue;
use crate::shutdown::{ExitLatch, ShutdownSignal};
use crate::signer::Signer;
use crate::transport::Transport;
use crate::transport::http::HttpTransport;
use crate::worker::{self, WorkerContext};

/// How `close` finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Every worker exited on its own.
    Clean,
    /// The timeout fired first; this many workers were aborted, possibly
    /// mid-request. Their messages never reach the callback.
    TimedOut { remaining: usize },
}

/// A running pool of workers draining a bounded queue.
///
/// `post` and `close` take `&self`, so the dispatcher can be shared behind an
/// `Arc` and closed while other tasks are still posting.
pub struct Dispatcher {
    queue: RequestQueue,
    workers: usize,
    shutdown: ShutdownSignal,
    latch: Arc<ExitLatch>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Dispatcher {
    /// Validate, derive the credential hashes and start the workers against
    /// the live endpoint. Must be called from inside a tokio runtime.
    pub fn open(params: Parameters, callback: Callback) -> Result<Self, DispatchError> {
        let transport = Arc::new(HttpTransport::new(params.timeout)?);
        Self::open_with(params, transport, callback)
    }

    /// Like [`Dispatcher::open`] with a caller-supplied transport.
    pub fn open_with(
        params: Parameters,
        transport: Arc<dyn Transport>,
        callback: Callback,
    ) -> Result<Self, DispatchError> {
        params.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let (queue, receiver) = RequestQueue::new(params.queue_capacity, params.workers);
        let receiver = Arc::new(receiver);
        let ctx = Arc::new(WorkerContext {
            signer: Signer::new(&params.app_key, &params.app_secret),
            transport,
            callback,
            endpoint: params.endpoint.clone(),
            body_encoding: params.body_encoding,
        });

        let shutdown = ShutdownSignal::new();
        let latch = ExitLatch::new(params.workers);
        let handles = (0..params.workers)
            .map(|i| {
                runtime.spawn(worker::run(
                    i,
                    Arc::clone(&ctx),
                    Arc::clone(&receiver),
                    shutdown.subscribe(),
                    latch.guard(),
                ))
            })
            .collect();

        tracing::info!(
            workers = params.workers,
            capacity = params.queue_capacity,
            endpoint = %params.endpoint,
            "dispatcher opened"
        );

        Ok(Self {
            queue,
            workers: params.workers,
            shutdown,
            latch,
            handles: Mutex::new(handles),
            closed: AtomicBool::new(false),
        })
    }

    /// Enqueue a question. Returns its id; the answer arrives via the callback.
    /// Never blocks.
    pub fn post(&self, user_id: &str, question: &str) -> Result<u64, DispatchError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DispatchError::Closed);
        }
        let result = self.queue.push(user_id, question);
        match &result {
            Ok(id) => tracing::debug!(id, %user_id, "posted"),
            Err(e) => tracing::debug!(%user_id, error = %e, "post rejected"),
        }
        result
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Messages waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Signal every worker to stop and wait up to `timeout` for them.
    ///
    /// Workers finish their current call before noticing the signal. Queued
    /// messages are dropped. If the timeout fires first, the remaining worker
    /// tasks are aborted and `Shutdown::TimedOut` is returned.
    pub async fn close(&self, timeout: Duration) -> Result<Shutdown, DispatchError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::Closed);
        }

        let signalled = self.shutdown.fire();
        tracing::info!(signalled, pending = self.queue.len(), "closing dispatcher");

        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        if self.latch.wait_timeout(timeout).await {
            tracing::info!("dispatcher closed");
            return Ok(Shutdown::Clean);
        }

        let remaining = self.latch.remaining();
        tracing::warn!(
            remaining,
            ?timeout,
            "workers did not exit in time, abandoning in-flight requests"
        );
        for handle in handles.iter().filter(|h| !h.is_finished()) {
            handle.abort();
        }
        Ok(Shutdown::TimedOut { remaining })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let handles = self
            .handles
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}
