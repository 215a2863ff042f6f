//! Dispatcher construction parameters.

use std::time::Duration;

use crate::consts::{DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS, REQ_URL};
use crate::error::DispatchError;
use crate::form::BodyEncoding;

/// Everything `Dispatcher::open` needs. Fixed for the dispatcher's lifetime.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub app_key: String,
    pub app_secret: String,
    /// Number of concurrent workers, also the admission margin.
    pub workers: usize,
    pub queue_capacity: usize,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
    pub endpoint: String,
    pub body_encoding: BodyEncoding,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            app_secret: String::new(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            endpoint: REQ_URL.to_string(),
            body_encoding: BodyEncoding::Raw,
        }
    }
}

impl Parameters {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        let invalid = |msg: &str| Err(DispatchError::InvalidParameters(msg.to_string()));

        if self.app_key.is_empty() {
            return invalid("app_key must not be empty");
        }
        if self.app_secret.is_empty() {
            return invalid("app_secret must not be empty");
        }
        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        // Below this, admission would reject every post.
        if self.queue_capacity < self.workers {
            return invalid("queue_capacity must be at least the worker count");
        }
        if self.timeout.is_zero() {
            return invalid("timeout must be non-zero");
        }
        match reqwest::Url::parse(&self.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(_) => invalid("endpoint must be an http or https url"),
            Err(e) => Err(DispatchError::InvalidParameters(format!(
                "endpoint is not a valid url: {e}"
            ))),
        }
    }
}
