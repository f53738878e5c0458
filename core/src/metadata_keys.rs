//! Reserved metadata keys
//!
//! Listeners and the pipe runner attach context under these keys; endpoints
//! and scripts may read them. User metadata should avoid the `keskus.`
//! prefix.

/// Selector (topic) the message arrived on
pub const TOPIC: &str = "keskus.topic";

/// Name of the listener that produced the message
pub const LISTENER: &str = "keskus.listener";

/// Uri of the pipe that carried the message
pub const PIPE: &str = "keskus.pipe";
