//! The persisted Pipe entity
//!
//! A pipe binds one listener, a transform script, and one-or-more endpoints
//! under a connection uri. Pipes hold only *references* (uid + registered
//! type + raw config) to registry-managed components, never the components
//! themselves: persistence stays storage-engine agnostic while runtime
//! wiring stays in-memory, and deleting a pipe never cascades into
//! instances other pipes may share.

use crate::script::Script;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Reference to a registry-managed component
///
/// `uid` is the instance identity handed to the registry's get-or-create;
/// `kind` is the registered type name; `config` is the raw map validated
/// against that type's declared parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Instance identity
    pub uid: String,
    /// Registered component type name
    pub kind: String,
    /// Raw configuration, validated before the builder runs
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl EntityRef {
    /// Reference an instance of a registered type
    pub fn new(uid: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            kind: kind.into(),
            config: HashMap::new(),
        }
    }

    /// Attach one raw configuration entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Endpoint reference storage - most pipes have one or two sinks
pub type EndpointRefs = SmallVec<[EntityRef; 2]>;

/// Descriptive half of a pipe: identity, provenance, and the script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile identity
    pub uid: String,
    /// Human name
    pub name: String,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Profile version
    #[serde(default)]
    pub version: String,
    /// Transform applied to every message; empty means pass-through
    #[serde(default)]
    pub script: Script,
}

/// A persisted pipe: listener → script → endpoints, keyed by uri
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Connection uri; the persistence key, unique within the store, and
    /// the selector handed to the listener when the pipe starts
    pub uri: String,
    /// The one listener feeding this pipe
    pub listener: EntityRef,
    /// The sinks receiving this pipe's output
    pub endpoints: EndpointRefs,
    /// Identity, provenance, and script
    pub profile: Profile,
}

impl Pipe {
    /// Assemble a pipe
    pub fn new(
        uri: impl Into<String>,
        listener: EntityRef,
        endpoints: impl IntoIterator<Item = EntityRef>,
        profile: Profile,
    ) -> Self {
        Self {
            uri: uri.into(),
            listener,
            endpoints: endpoints.into_iter().collect(),
            profile,
        }
    }
}
