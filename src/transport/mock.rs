use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{AskRequest, Transport};
use crate::error::DeliveryError;

/// What the mock does for one call.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub result: Result<String, DeliveryError>,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(body.into()),
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(DeliveryError::Status(code)),
        }
    }

    pub fn error(err: DeliveryError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    /// Sleep before replying, to simulate a slow endpoint.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A scripted transport for tests. Replies in order, then repeats the
/// fallback reply. Records every request it sees.
pub struct MockTransport {
    replies: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    requests: Mutex<Vec<AskRequest>>,
}

impl MockTransport {
    /// Every call gets the same reply.
    pub fn always(reply: MockReply) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(replies: Vec<MockReply>, fallback: MockReply) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<AskRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &AskRequest) -> Result<String, DeliveryError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| self.fallback.clone());
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}
