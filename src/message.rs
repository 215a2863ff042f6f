use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::DeliveryError;

/// One question travelling through the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned at enqueue time, starts at 1.
    pub id: u64,
    pub user_id: String,
    pub question: String,
    /// Raw response body. Empty until answered, and stays empty on failure.
    pub answer: String,
    /// Set when the exchange failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DeliveryError>,
}

impl Message {
    pub fn new(id: u64, user_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            question: question.into(),
            answer: String::new(),
            failure: None,
        }
    }

    /// The exchange succeeded. The answer may still be empty if the
    /// endpoint returned an empty body.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Completion callback, invoked once per processed message from a worker task.
pub type Callback = Arc<dyn Fn(Message) + Send + Sync>;
