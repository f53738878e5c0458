//! Endpoint trait for Keskus components
//!
//! The [`Endpoint`] trait defines the sink capability: delivering messages
//! to an external destination. Every endpoint a pipe references receives the
//! pipe's output in a fan-out pattern.

use crate::error::ComponentError;
use crate::message::Message;
use async_trait::async_trait;

/// Endpoint trait - delivers Messages to a destination
///
/// # Implementation Requirements
///
/// - Endpoints must be `Send + Sync`; one instance may be shared by every
///   pipe that references the same uid
/// - `deliver` receives a batch and should handle it atomically where the
///   destination allows
/// - Health checks should be lightweight
/// - Shutdown should flush pending data and release resources
///
/// # Example
///
/// ```ignore
/// use keskus_core::{ComponentError, Endpoint, Message};
/// use async_trait::async_trait;
///
/// struct HttpEndpoint {
///     client: reqwest::Client,
///     url: String,
/// }
///
/// #[async_trait]
/// impl Endpoint for HttpEndpoint {
///     fn name(&self) -> &str {
///         "http"
///     }
///
///     async fn deliver(&self, messages: &[Message]) -> Result<(), ComponentError> {
///         for msg in messages {
///             self.client.post(&self.url)
///                 .body(msg.payload.clone())
///                 .send()
///                 .await
///                 .map_err(|e| ComponentError::Deliver(e.to_string()))?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Short name for this endpoint (for logging)
    fn name(&self) -> &str;

    /// Deliver a batch of messages to the destination
    ///
    /// The slice may be empty. A returned error means one or more messages
    /// failed; the caller logs it and moves on - a failing endpoint never
    /// blocks delivery to its siblings.
    async fn deliver(&self, messages: &[Message]) -> Result<(), ComponentError>;

    /// Check whether the destination is reachable and accepting messages
    async fn health(&self) -> bool {
        true
    }

    /// Graceful shutdown: flush buffers, close connections
    ///
    /// The default implementation does nothing.
    async fn shutdown(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}
