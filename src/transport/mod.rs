pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::error::DeliveryError;

/// A fully prepared ask call: where to send it, how it is signed, what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub url: String,
    /// Value of the `X-Auth` header.
    pub auth_header: String,
    /// Form-encoded body.
    pub body: String,
}

/// One HTTP exchange with the ask endpoint. Could be reqwest or a test script.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response body on a success status.
    async fn send(&self, request: &AskRequest) -> Result<String, DeliveryError>;
}
