use async_trait::async_trait;
use std::time::Duration;

use super::{AskRequest, Transport};
use crate::consts::{AUTH_HEADER, CONTENT_TYPE};
use crate::error::{DeliveryError, DispatchError};

/// Sends ask calls with a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `timeout` bounds each whole exchange, connect through body read.
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &AskRequest) -> Result<String, DeliveryError> {
        let resp = self
            .client
            .post(&request.url)
            .header(AUTH_HEADER, &request.auth_header)
            .header("Content-Type", CONTENT_TYPE)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DeliveryError::Read(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
