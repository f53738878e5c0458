//! Error types for Keskus components

use thiserror::Error;

/// Error type for component operations
///
/// This is the standard error type used by listener and endpoint
/// implementations. Builders return it when construction fails, channels
/// deliver it on their error stream, and endpoints return it from delivery.
///
/// # Example
///
/// ```
/// use keskus_core::ComponentError;
///
/// fn connect_to_broker() -> Result<(), ComponentError> {
///     Err(ComponentError::Connection("refused".to_string()))
/// }
///
/// match connect_to_broker() {
///     Ok(_) => println!("connected"),
///     Err(ComponentError::Connection(msg)) => println!("connection failed: {}", msg),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// Initialization failed
    ///
    /// Returned when a component fails to construct, typically from a
    /// builder. Examples: invalid configuration, failed to bind a port,
    /// missing credentials.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Decode failed
    ///
    /// Delivered on a channel's error stream when incoming raw data cannot
    /// be decoded into a message.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Delivery failed
    ///
    /// Returned when an endpoint fails to deliver messages to its
    /// destination. Examples: network timeout, destination rejected the
    /// batch, quota exceeded.
    #[error("delivery failed: {0}")]
    Deliver(String),

    /// Connection error
    ///
    /// Examples: DNS lookup failed, connection refused, broker went away.
    #[error("connection error: {0}")]
    Connection(String),

    /// No data available from the source
    ///
    /// Delivered on the error stream when a pull finds nothing to read.
    /// Transient; the channel stays alive.
    #[error("no data available")]
    NoData,

    /// Shutdown error
    ///
    /// Returned when graceful shutdown fails, e.g. pending deliveries could
    /// not be flushed.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}
