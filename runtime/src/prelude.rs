//! One-stop imports for wiring a Keskus hub
//!
//! ```ignore
//! use keskus_runtime::prelude::*;
//! ```

pub use crate::{run, RuntimeBuilder};

pub use keskus_core::{
    channel, Channel, ChannelEvent, ChannelSource, ComponentError, Endpoint, Listener, Message,
};
pub use keskus_hub::describe::{ParamKind, Parameter, Parameters, Values};
pub use keskus_hub::pipe::{EntityRef, Pipe, Profile};
pub use keskus_hub::registry::{Builder, Capability, Component, Registry};
pub use keskus_hub::runner::{PipeRunner, RunnerHandle};
pub use keskus_hub::script::Script;
pub use keskus_hub::store::{MemoryStore, PipeBucket, Store};
pub use keskus_hub::HubError;
