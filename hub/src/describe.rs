//! Parameter descriptors for component configuration
//!
//! Every registered component type declares the configuration it accepts as
//! an ordered set of [`Parameter`]s. Raw string-keyed maps are validated
//! against that set *before* any builder runs, producing typed [`Values`].
//! The same descriptors drive external help/validation surfaces via
//! [`Registry::describe_listener`](crate::Registry::describe_listener) and
//! friends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Scalar kind a parameter value is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// UTF-8 text, taken verbatim
    String,
    /// Signed 64-bit integer
    Int,
    /// `true` or `false`
    Bool,
    /// 64-bit float
    Float,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParamKind::String => "string",
            ParamKind::Int => "int",
            ParamKind::Bool => "bool",
            ParamKind::Float => "float",
        };
        f.write_str(s)
    }
}

/// One named, typed configuration parameter of a component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Identifier used as the key in raw configuration maps
    pub name: String,
    /// Human description, surfaced by help/describe
    pub description: String,
    /// Scalar kind the raw string is coerced to
    pub kind: ParamKind,
    /// Whether the parameter must be supplied (or defaulted)
    pub required: bool,
    /// Raw default applied when an optional parameter is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    /// A required parameter
    pub fn required(name: impl Into<String>, description: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
            default: None,
        }
    }

    /// An optional parameter
    pub fn optional(name: impl Into<String>, description: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            default: None,
        }
    }

    /// Attach a raw default value, applied when the key is absent
    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }
}

/// The ordered configuration surface of one component type
pub type Parameters = Vec<Parameter>;

/// Configuration validation failure, naming the offending parameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required parameter was not supplied
    #[error("required parameter '{0}' is missing")]
    MissingRequired(String),

    /// A supplied key matches no declared parameter
    #[error("parameter '{0}' is not recognized")]
    Unrecognized(String),

    /// A supplied value could not be coerced to the declared kind
    #[error("parameter '{name}' expects a {kind} value, got '{raw}'")]
    Coercion {
        /// Offending parameter name
        name: String,
        /// Declared kind
        kind: ParamKind,
        /// Raw value that failed to coerce
        raw: String,
    },
}

/// A typed configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Verbatim text
    Str(String),
    /// Parsed integer
    Int(i64),
    /// Parsed boolean
    Bool(bool),
    /// Parsed float
    Float(f64),
}

/// A validated mapping from parameter name to typed value
///
/// Produced by [`Values::new`]; handed to builders. Every required
/// parameter is present, every key was recognized, every coercion
/// succeeded.
#[derive(Debug, Clone, Default)]
pub struct Values {
    inner: HashMap<String, Value>,
}

impl Values {
    /// Validate a raw string map against a parameter set
    pub fn new(
        raw: &HashMap<String, String>,
        parameters: &Parameters,
    ) -> Result<Self, ValidationError> {
        for key in raw.keys() {
            if !parameters.iter().any(|p| &p.name == key) {
                return Err(ValidationError::Unrecognized(key.clone()));
            }
        }

        let mut inner = HashMap::with_capacity(parameters.len());
        for param in parameters {
            let supplied = raw.get(&param.name).or(param.default.as_ref());
            let raw_value = match supplied {
                Some(v) => v,
                None if param.required => {
                    return Err(ValidationError::MissingRequired(param.name.clone()));
                }
                None => continue,
            };
            inner.insert(param.name.clone(), coerce(param, raw_value)?);
        }

        Ok(Self { inner })
    }

    /// Look up a typed value by parameter name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Text value of a string parameter
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.inner.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of an int parameter
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.inner.get(name) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Value of a bool parameter
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.inner.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Value of a float parameter
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.inner.get(name) {
            Some(Value::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Whether a value is present for the name
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of resolved values
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no values were resolved
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn coerce(param: &Parameter, raw: &str) -> Result<Value, ValidationError> {
    let err = || ValidationError::Coercion {
        name: param.name.clone(),
        kind: param.kind,
        raw: raw.to_string(),
    };

    match param.kind {
        ParamKind::String => Ok(Value::Str(raw.to_string())),
        ParamKind::Int => raw.parse().map(Value::Int).map_err(|_| err()),
        ParamKind::Bool => raw.parse().map(Value::Bool).map_err(|_| err()),
        ParamKind::Float => raw.parse().map(Value::Float).map_err(|_| err()),
    }
}
