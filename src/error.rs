//! Error types.
//!
//! [`DispatchError`] is returned synchronously to callers of the dispatcher.
//! [`DeliveryError`] never reaches a caller directly: it is logged by the
//! worker and recorded on the [`Message`](crate::message::Message) handed to
//! the completion callback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned from `open`, `post` and `close`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Admission control rejected the message; the caller may retry later.
    #[error("queue full")]
    QueueFull,

    #[error("dispatcher is closed")]
    Closed,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("no tokio runtime available to spawn workers")]
    NoRuntime,

    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Why a message came back without an answer.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryError {
    /// The request never got a response (connect, timeout, ...).
    #[error("http request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("http response status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Read(String),
}
