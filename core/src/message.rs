//! The Message envelope for Keskus
//!
//! A Message is the universal envelope that flows from a listener's channel,
//! through the transform stage, to every endpoint of a pipe. The hub never
//! interprets the payload; it is opaque bytes. Metadata is an open string
//! map carrying pass-through context such as the originating topic.
//!
//! # Zero-Copy Design
//!
//! ```text
//! Listener decodes a 10KB payload into Bytes
//!                     │
//!                     ▼
//! Message cloned per endpoint  ← just increments a refcount
//!                     │
//!     ┌───────────────┼───────────────┐
//!     ▼               ▼               ▼
//! Endpoint A      Endpoint B      Endpoint C
//! (all share the same underlying bytes - no copies)
//! ```

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Metadata storage - lazy allocation
///
/// `None` while empty, so an envelope with no metadata costs nothing beyond
/// the option itself.
pub type Metadata = Option<Box<HashMap<String, String>>>;

fn metadata_ref(m: &Metadata) -> &HashMap<String, String> {
    static EMPTY: std::sync::OnceLock<HashMap<String, String>> = std::sync::OnceLock::new();
    m.as_ref()
        .map(|b| b.as_ref())
        .unwrap_or_else(|| EMPTY.get_or_init(HashMap::new))
}

/// Unique message identifier
///
/// A ULID: 16 bytes, `Copy`, time-ordered, cheap to compare and hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(ulid::Ulid);

impl MessageId {
    /// Generate a new unique ID
    #[inline]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the underlying ULID
    #[inline]
    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl From<ulid::Ulid> for MessageId {
    fn from(ulid: ulid::Ulid) -> Self {
        Self(ulid)
    }
}

/// The universal message envelope - opaque payload, pass-through metadata
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use keskus_core::Message;
///
/// let msg = Message::new(Bytes::from(r#"{"temperature": 21.5}"#))
///     .with_metadata("topic", "/devices/greenhouse");
/// assert_eq!(msg.metadata().get("topic"), Some(&"/devices/greenhouse".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique identifier (binary ULID - 16 bytes, Copy)
    pub id: MessageId,

    /// Unix timestamp in nanoseconds
    pub timestamp: i64,

    /// Headers and context (propagated through the pipe)
    ///
    /// Lazily allocated - None while empty.
    pub metadata: Metadata,

    /// Opaque payload - zero-copy via Bytes
    ///
    /// Keskus doesn't interpret this. Listeners decode their wire format
    /// into it, endpoints serialize it for their destination.
    pub payload: Bytes,
}

impl Message {
    /// Create a new Message with auto-generated ID and current timestamp
    pub fn new(payload: Bytes) -> Self {
        Self {
            id: MessageId::new(),
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
            metadata: None,
            payload,
        }
    }

    /// Create a Message with all fields specified
    pub fn with_id(id: impl Into<MessageId>, timestamp: i64, payload: Bytes) -> Self {
        Self {
            id: id.into(),
            timestamp,
            metadata: None,
            payload,
        }
    }

    /// Add a metadata entry to the message
    ///
    /// # Example
    /// ```
    /// use bytes::Bytes;
    /// use keskus_core::Message;
    ///
    /// let msg = Message::new(Bytes::new())
    ///     .with_metadata("topic", "/a")
    ///     .with_metadata("device", "thermostat-4");
    /// ```
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(|| Box::new(HashMap::new()))
            .insert(key.into(), value.into());
        self
    }

    /// Get metadata reference (returns an empty map if None)
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        metadata_ref(&self.metadata)
    }

    /// Get mutable metadata, allocating if needed
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut HashMap<String, String> {
        self.metadata
            .get_or_insert_with(|| Box::new(HashMap::new()))
    }

    /// Get payload as a string slice (if valid UTF-8)
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Get payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
