//! KESKUS - Device-Data Hub
//!
//! Keskus ingests streams of measurements from heterogeneous sources
//! ("listeners"), optionally transforms each message through a user-supplied
//! script, and forwards the result to one or more sinks ("endpoints"). A
//! named, persisted binding of one listener, a transform script, and a set
//! of endpoints is a **pipe**.
//!
//! ```text
//! Listener ──► Channel ──► Script ──► Endpoints (fan-out)
//!    ▲                                    ▲
//!    └────────── Registry ────────────────┘
//!                   ▲
//!                 Pipes (persisted in a bucket store)
//! ```
//!
//! This crate holds the hub side: the component [`registry`], the parameter
//! [`describe`] layer it validates configuration against, the [`script`]
//! seam, the persisted [`pipe`] entity and its [`store`], and the [`runner`]
//! that wires a resolved pipe together. The capability traits and the
//! message envelope live in `keskus-core` so component implementations never
//! depend on this crate.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod describe;
pub mod error;
pub mod pipe;
pub mod registry;
pub mod runner;
pub mod script;
pub mod store;

pub use config::{Config, LogFormat};
pub use describe::{ParamKind, Parameter, Parameters, ValidationError, Value, Values};
pub use error::{HubError, Result};
pub use pipe::{EndpointRefs, EntityRef, Pipe, Profile};
pub use registry::{Builder, Capability, Component, Registry};
pub use runner::{PipeRunner, RunnerHandle, RunnerStats};
pub use script::{Passthrough, Script, ScriptEngine, Transform};
pub use store::{MemoryStore, PipeBucket, Store, StoreError};

// Re-export the component-facing surface for convenience
pub use keskus_core::{
    channel, Channel, ChannelEvent, ChannelSource, ComponentError, Endpoint, Listener, Message,
};
