//! Error types for the Keskus hub

use crate::describe::ValidationError;
use crate::registry::Capability;
use crate::store::StoreError;
use keskus_core::ComponentError;
use thiserror::Error;

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Main error type for the Keskus hub
///
/// Registration and lookup errors are returned synchronously; build
/// failures are cached by the registry so repeated lookups of a failed uid
/// return [`HubError::Build`] without re-running the builder. Streaming
/// errors travel a channel's error stream as [`ComponentError`] and never
/// appear here.
#[derive(Error, Debug)]
pub enum HubError {
    /// A component type was registered without declaring any parameters
    ///
    /// A component must document its configuration surface before it can be
    /// used; this is a programming error in the registering package, caught
    /// before any service starts.
    #[error("{capability} type '{type_name}' registered without any parameters")]
    EmptyParameters {
        /// Which table the registration targeted
        capability: Capability,
        /// The rejected type name
        type_name: String,
    },

    /// No parameters are registered for the requested type
    #[error("parameters for {capability} type '{type_name}' not found")]
    UnknownType {
        /// Which table was searched
        capability: Capability,
        /// The missing type name
        type_name: String,
    },

    /// Neither the uid nor the type name resolved to a builder
    #[error("builder with uid '{uid}', type '{type_name}' not found")]
    BuilderNotFound {
        /// Requested instance identity
        uid: String,
        /// Requested type name
        type_name: String,
    },

    /// Raw configuration failed validation against the declared parameters
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The resolved builder's product does not satisfy the requested role
    #[error("builder registered with uid '{uid}', type '{type_name}' does not produce a {expected}")]
    CapabilityMismatch {
        /// Requested instance identity
        uid: String,
        /// Requested type name
        type_name: String,
        /// Capability the caller asked for
        expected: Capability,
    },

    /// The builder itself failed; the failure is cached for the uid
    ///
    /// Repeated lookups return this same error without re-running the
    /// builder. Retry requires explicit eviction or re-registration.
    #[error("building '{uid}' failed: {source}")]
    Build {
        /// Instance identity the failure is cached under
        uid: String,
        /// The builder's error
        #[source]
        source: ComponentError,
    },

    /// A channel could not be created on a resolved listener
    #[error("channel error: {0}")]
    Channel(ComponentError),

    /// Script compilation or execution failed
    #[error("script error: {0}")]
    Script(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Propagated verbatim from the external store
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts() {
        let err: HubError = ValidationError::MissingRequired("broker".to_string()).into();
        assert!(matches!(err, HubError::Validation(_)));
        assert!(err.to_string().contains("broker"));
    }

    #[test]
    fn build_error_carries_source() {
        let err = HubError::Build {
            uid: "mqtt-1".to_string(),
            source: ComponentError::Connection("refused".to_string()),
        };
        assert!(err.to_string().contains("mqtt-1"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn hub_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HubError>();
    }
}
