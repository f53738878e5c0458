//! Listener trait for Keskus components
//!
//! A [`Listener`] is the source capability: a long-lived connection to some
//! origin of device data (a broker subscription, a socket, a file tail) that
//! hands out independent streaming [`Channel`]s on demand.

use crate::channel::Channel;
use crate::error::ComponentError;

/// Listener trait - produces streaming channels of decoded messages
///
/// One listener instance may serve many channels (e.g. one per topic); each
/// channel is independent and may be consumed concurrently. Ordering is only
/// guaranteed within a single channel.
///
/// Retry/backoff for source connectivity is the listener's own business;
/// the hub never reconnects on a listener's behalf.
///
/// # Implementing a Listener
///
/// ```ignore
/// use keskus_core::{channel, Channel, ComponentError, Listener, Message};
///
/// struct BrokerListener { /* connection handle */ }
///
/// impl Listener for BrokerListener {
///     fn name(&self) -> &str {
///         "broker"
///     }
///
///     fn new_channel(&self, selector: &str) -> Result<Channel, ComponentError> {
///         let (consumer, mut source) = channel(64);
///         let subscription = self.subscribe(selector)?;
///         tokio::spawn(async move {
///             while source.pulled().await {
///                 match subscription.fetch().await {
///                     Ok(msg) => { let _ = source.deliver(msg).await; }
///                     Err(e) => { let _ = source.fail(e).await; }
///                 }
///             }
///         });
///         Ok(consumer)
///     }
/// }
/// ```
pub trait Listener: Send + Sync {
    /// Short name for this listener (for logging)
    fn name(&self) -> &str;

    /// Create a new independent channel for the given selector
    ///
    /// The selector's meaning is listener-defined (an MQTT topic filter, a
    /// file path, ...). The returned channel produces nothing until its
    /// consumer starts pulling; tearing it down is the consumer's job
    /// (drop it and stop pulling).
    fn new_channel(&self, selector: &str) -> Result<Channel, ComponentError>;
}
