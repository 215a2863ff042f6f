//! The worker loop: take a message, make one signed call, hand it back.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::form::{BodyEncoding, build_body};
use crate::message::{Callback, Message};
use crate::queue::QueueReceiver;
use crate::shutdown::ExitGuard;
use crate::signer::Signer;
use crate::transport::{AskRequest, Transport};

/// State shared read-only by every worker.
pub struct WorkerContext {
    pub signer: Signer,
    pub transport: Arc<dyn Transport>,
    pub callback: Callback,
    pub endpoint: String,
    pub body_encoding: BodyEncoding,
}

impl WorkerContext {
    /// Sign and send one message, filling in the answer or the failure.
    /// Never retries.
    pub async fn process(&self, msg: &mut Message) {
        let signed = self.signer.sign_request();
        tracing::debug!(id = msg.id, auth = %signed.header, "signed request");

        let request = AskRequest {
            url: self.endpoint.clone(),
            auth_header: signed.header,
            body: build_body(&msg.user_id, &msg.question, self.body_encoding),
        };
        tracing::trace!(id = msg.id, body = %request.body, "request body");

        match self.transport.send(&request).await {
            Ok(answer) => {
                tracing::debug!(id = msg.id, bytes = answer.len(), "answered");
                msg.answer = answer;
            }
            Err(e) => {
                tracing::warn!(id = msg.id, user_id = %msg.user_id, error = %e, "delivery failed");
                msg.failure = Some(e);
            }
        }
    }
}

/// Run until shutdown is signalled or the queue is gone. Queued messages
/// left behind at shutdown are not drained.
pub async fn run(
    index: usize,
    ctx: Arc<WorkerContext>,
    queue: Arc<QueueReceiver>,
    mut shutdown: broadcast::Receiver<()>,
    _exit: ExitGuard,
) {
    tracing::debug!(worker = index, "worker started");
    loop {
        let mut msg = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            next = queue.next() => match next {
                Some(msg) => msg,
                None => break,
            },
        };

        ctx.process(&mut msg).await;
        let id = msg.id;
        // A panicking callback must not take the worker down with it.
        if panic::catch_unwind(AssertUnwindSafe(|| (ctx.callback)(msg))).is_err() {
            tracing::error!(id, worker = index, "completion callback panicked");
        }
    }
    tracing::debug!(worker = index, "worker stopped");
}
