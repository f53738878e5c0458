//! Script transform seam
//!
//! A pipe's profile carries a [`Script`]; the runner applies it to every
//! message coming off the listener's channel. The contract is narrow:
//! `(payload, metadata)` goes in, zero-or-more `(payload, metadata)` outputs
//! come out, or an error. Anything satisfying [`Transform`] can sit behind
//! the seam; the bundled engine is Rhai.
//!
//! # Script surface
//!
//! Two variables are in scope for every invocation:
//! - `payload` - the message payload as a blob
//! - `metadata` - the message metadata as a string map
//!
//! The script's result decides the outputs:
//! - `()` - drop the message (zero outputs)
//! - a blob or string - one output with that payload, metadata inherited
//! - a map `#{payload: ..., metadata: ...}` - one output, metadata replaced
//!   when the `metadata` field is present
//! - an array of any of the above - one output per element
//!
//! ```text
//! // double every reading, tag the unit
//! let reading = payload.as_string().parse_float() * 2.0;
//! #{ payload: reading.to_string(), metadata: #{ "unit": "celsius" } }
//! ```

use crate::error::HubError;
use bytes::Bytes;
use keskus_core::Message;
use rhai::{Dynamic, Engine, Scope, AST};
use serde::{Deserialize, Serialize};

/// A persisted transform script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Short name, for logging
    #[serde(default)]
    pub name: String,
    /// Script source text; empty means pass-through
    #[serde(default)]
    pub source: String,
}

impl Script {
    /// Create a named script from source text
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Whether there is nothing to execute
    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// The transform stage of a pipe
///
/// Applied to every message between the listener's channel and the endpoint
/// fan-out. A failure is per-message: the runner reports it and moves on.
pub trait Transform: Send + Sync {
    /// Produce zero-or-more output messages from one input
    fn apply(&self, message: &Message) -> Result<Vec<Message>, HubError>;
}

/// Identity transform used when a pipe has no script
pub struct Passthrough;

impl Transform for Passthrough {
    fn apply(&self, message: &Message) -> Result<Vec<Message>, HubError> {
        Ok(vec![message.clone()])
    }
}

/// Rhai-backed [`Transform`]
///
/// The source is compiled once at pipe start; each invocation evaluates the
/// cached AST with a fresh scope.
pub struct ScriptEngine {
    engine: Engine,
    ast: AST,
    name: String,
}

impl ScriptEngine {
    /// Compile a script, failing fast on syntax errors
    pub fn compile(script: &Script) -> Result<Self, HubError> {
        let engine = Engine::new();
        let ast = engine
            .compile(&script.source)
            .map_err(|e| HubError::Script(format!("compile '{}': {}", script.name, e)))?;
        Ok(Self {
            engine,
            ast,
            name: script.name.clone(),
        })
    }

    /// Script name, for logging
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transform for ScriptEngine {
    fn apply(&self, message: &Message) -> Result<Vec<Message>, HubError> {
        let mut scope = Scope::new();
        scope.push_dynamic("payload", Dynamic::from_blob(message.payload.to_vec()));

        let mut metadata = rhai::Map::new();
        for (key, value) in message.metadata() {
            metadata.insert(key.as_str().into(), Dynamic::from(value.clone()));
        }
        scope.push_dynamic("metadata", Dynamic::from_map(metadata));

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &self.ast)
            .map_err(|e| HubError::Script(format!("run '{}': {}", self.name, e)))?;

        outputs_from(result, message, &self.name)
    }
}

fn outputs_from(result: Dynamic, input: &Message, name: &str) -> Result<Vec<Message>, HubError> {
    if result.is_unit() {
        return Ok(Vec::new());
    }

    if result.is_array() {
        let array = result
            .try_cast::<rhai::Array>()
            .ok_or_else(|| HubError::Script(format!("'{name}': array result failed to cast")))?;
        let mut outputs = Vec::with_capacity(array.len());
        for element in array {
            if element.is_unit() {
                continue;
            }
            outputs.push(single_output(element, input, name)?);
        }
        return Ok(outputs);
    }

    Ok(vec![single_output(result, input, name)?])
}

fn single_output(value: Dynamic, input: &Message, name: &str) -> Result<Message, HubError> {
    if value.is_map() {
        let map = value
            .try_cast::<rhai::Map>()
            .ok_or_else(|| HubError::Script(format!("'{name}': map result failed to cast")))?;

        let payload = match map.get("payload") {
            Some(p) => payload_bytes(p.clone(), name)?,
            None => input.payload.clone(),
        };

        let mut output = Message::new(payload);
        match map.get("metadata") {
            Some(meta) => {
                let meta = meta.clone().try_cast::<rhai::Map>().ok_or_else(|| {
                    HubError::Script(format!("'{name}': metadata must be a map"))
                })?;
                for (key, value) in meta {
                    output = output.with_metadata(key.to_string(), dynamic_to_string(value));
                }
            }
            None => {
                output.metadata = input.metadata.clone();
            }
        }
        return Ok(output);
    }

    let mut output = Message::new(payload_bytes(value, name)?);
    output.metadata = input.metadata.clone();
    Ok(output)
}

fn payload_bytes(value: Dynamic, name: &str) -> Result<Bytes, HubError> {
    if value.is_blob() {
        return value
            .try_cast::<rhai::Blob>()
            .map(Bytes::from)
            .ok_or_else(|| HubError::Script(format!("'{name}': blob payload failed to cast")));
    }
    if value.is_string() {
        return value
            .into_string()
            .map(Bytes::from)
            .map_err(|t| HubError::Script(format!("'{name}': expected string payload, got {t}")));
    }
    Err(HubError::Script(format!(
        "'{name}': payload must be a blob or string, got {}",
        value.type_name()
    )))
}

fn dynamic_to_string(value: Dynamic) -> String {
    if value.is_string() {
        value.into_string().unwrap_or_default()
    } else {
        // numbers, bools etc. stringify via Display
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(payload: &str) -> Message {
        Message::new(Bytes::from(payload.to_string())).with_metadata("topic", "/a")
    }

    #[test]
    fn passthrough_returns_the_message_unchanged() {
        let msg = input("hello");
        let outputs = Passthrough.apply(&msg).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].payload, msg.payload);
        assert_eq!(outputs[0].metadata(), msg.metadata());
    }

    #[test]
    fn string_result_becomes_one_output_with_inherited_metadata() {
        let engine =
            ScriptEngine::compile(&Script::new("upper", r#"payload.as_string().to_upper()"#))
                .unwrap();
        let outputs = engine.apply(&input("hello")).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].payload_str(), Some("HELLO"));
        assert_eq!(outputs[0].metadata().get("topic"), Some(&"/a".to_string()));
    }

    #[test]
    fn unit_result_drops_the_message() {
        let engine = ScriptEngine::compile(&Script::new("drop", "()")).unwrap();
        let outputs = engine.apply(&input("hello")).unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn map_result_can_replace_metadata() {
        let source = r#"#{ payload: "converted", metadata: #{ "unit": "celsius" } }"#;
        let engine = ScriptEngine::compile(&Script::new("retag", source)).unwrap();
        let outputs = engine.apply(&input("21.5")).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].payload_str(), Some("converted"));
        assert_eq!(outputs[0].metadata().get("unit"), Some(&"celsius".to_string()));
        // Replaced, not merged
        assert_eq!(outputs[0].metadata().get("topic"), None);
    }

    #[test]
    fn map_without_metadata_inherits_the_input_metadata() {
        let engine =
            ScriptEngine::compile(&Script::new("keep", r#"#{ payload: "x" }"#)).unwrap();
        let outputs = engine.apply(&input("y")).unwrap();
        assert_eq!(outputs[0].metadata().get("topic"), Some(&"/a".to_string()));
    }

    #[test]
    fn array_result_fans_out_to_multiple_outputs() {
        let engine =
            ScriptEngine::compile(&Script::new("split", r#"["first", "second"]"#)).unwrap();
        let outputs = engine.apply(&input("ignored")).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].payload_str(), Some("first"));
        assert_eq!(outputs[1].payload_str(), Some("second"));
    }

    #[test]
    fn script_can_read_metadata() {
        let engine =
            ScriptEngine::compile(&Script::new("echo-topic", r#"metadata["topic"]"#)).unwrap();
        let outputs = engine.apply(&input("x")).unwrap();
        assert_eq!(outputs[0].payload_str(), Some("/a"));
    }

    #[test]
    fn compile_error_is_reported_with_the_script_name() {
        let err = ScriptEngine::compile(&Script::new("broken", "let = ;"))
            .err()
            .unwrap();
        match err {
            HubError::Script(msg) => assert!(msg.contains("broken")),
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[test]
    fn runtime_error_is_per_message() {
        let engine =
            ScriptEngine::compile(&Script::new("throwy", r#"throw "bad reading""#)).unwrap();
        let err = engine.apply(&input("x")).unwrap_err();
        assert!(matches!(err, HubError::Script(_)));
    }

    #[test]
    fn numeric_result_is_rejected() {
        let engine = ScriptEngine::compile(&Script::new("num", "42")).unwrap();
        let err = engine.apply(&input("x")).unwrap_err();
        match err {
            HubError::Script(msg) => assert!(msg.contains("payload must be")),
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[test]
    fn empty_script_is_detectable() {
        assert!(Script::default().is_empty());
        assert!(Script::new("n", "   ").is_empty());
        assert!(!Script::new("n", "payload").is_empty());
    }
}
