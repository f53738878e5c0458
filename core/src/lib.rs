//! keskus-core - Core types for the Keskus device-data hub
//!
//! This crate provides the foundational types shared between the Keskus hub
//! and independently developed component implementations:
//!
//! - [`Message`] - the opaque payload + metadata envelope that flows through
//!   every pipe
//! - [`Listener`] trait - the source capability: hands out streaming
//!   [`Channel`]s on demand
//! - [`Endpoint`] trait - the sink capability: async delivery of message
//!   batches to a destination
//! - [`Channel`] - the pull-driven streaming handle every listener produces
//! - [`ComponentError`] - error type for component operations
//!
//! # Why this crate exists
//!
//! Listener and endpoint implementations live in their own crates and need
//! the capability traits and the envelope. Without `keskus-core` they would
//! depend on `keskus-hub`, but the hub may also want to depend on bundled
//! component crates, creating a cycle:
//!
//! ```text
//! keskus-core ◄── keskus-hub
//!     ▲
//!     └────────── component crates (listeners, endpoints)
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

mod channel;
mod endpoint;
mod error;
mod listen;
/// Reserved metadata key constants for Keskus messages
pub mod metadata_keys;
/// The opaque message envelope
pub mod message;

pub use channel::{channel, Channel, ChannelEvent, ChannelSource, DEFAULT_CHANNEL_CAPACITY};
pub use endpoint::Endpoint;
pub use error::ComponentError;
pub use listen::Listener;
pub use message::{Message, MessageId, Metadata};
