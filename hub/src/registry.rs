//! Component registry for Keskus
//!
//! The registry is the single authority on "has this logical component
//! already been constructed". It keeps two table pairs - one for listeners,
//! one for endpoints - each mapping a type name to a builder plus its
//! parameter descriptors, and an instance uid to an already-built, cached
//! component.
//!
//! Lookup is uid-first with a type-name fallback: most pipes share one
//! instance per type (e.g. one broker connection), while a pipe can pin a
//! dedicated instance by registering under its own uid. A builder runs at
//! most once per uid, even under concurrent first access, and its outcome -
//! success *or* failure - is cached so a flaky builder cannot retry-storm.
//!
//! The registry is an explicit object: construct one at process start and
//! inject it wherever components need resolving. Registration and
//! build-and-cache take a table's write lock; membership checks and
//! describes take the read side. Streaming traffic never touches these
//! locks - once an instance is resolved, its channels are on their own.

use crate::describe::{Parameters, Values};
use crate::error::HubError;
use keskus_core::{ComponentError, Endpoint, Listener};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The two component roles a builder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Source of messages
    Listener,
    /// Sink for messages
    Endpoint,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Listener => f.write_str("listener"),
            Capability::Endpoint => f.write_str("endpoint"),
        }
    }
}

/// A built component: the sealed union of the two capabilities
///
/// Builders return this instead of an untyped product, so a capability
/// mismatch is an explicit, matchable error rather than a failed downcast.
#[derive(Clone)]
pub enum Component {
    /// A source instance
    Listener(Arc<dyn Listener>),
    /// A sink instance
    Endpoint(Arc<dyn Endpoint>),
}

impl Component {
    fn capability(&self) -> Capability {
        match self {
            Component::Listener(_) => Capability::Listener,
            Component::Endpoint(_) => Capability::Endpoint,
        }
    }
}

/// Builder function registered per type name
///
/// Pure: takes validated [`Values`], returns a built component or an error.
/// The registry invokes it at most once per uid.
pub type Builder = Arc<dyn Fn(&Values) -> Result<Component, ComponentError> + Send + Sync>;

enum Built {
    Ready(Component),
    Failed(ComponentError),
}

struct Entry {
    builder: Builder,
    built: Option<Built>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Entry>,
    parameters: HashMap<String, Parameters>,
}

/// Registry of listener and endpoint builders and their cached instances
pub struct Registry {
    listeners: RwLock<Table>,
    endpoints: RwLock<Table>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Table::default()),
            endpoints: RwLock::new(Table::default()),
        }
    }

    // ── registration ─────────────────────────────────────────────

    /// Register a listener builder under a type name
    ///
    /// Fails with [`HubError::EmptyParameters`] if `params` is empty: a
    /// component must declare its configuration surface before it can be
    /// used. Re-registering a type replaces the previous builder (last
    /// write wins); the replacement is logged.
    pub fn register_listener(
        &self,
        type_name: impl Into<String>,
        builder: Builder,
        params: Parameters,
    ) -> Result<(), HubError> {
        register(&self.listeners, Capability::Listener, type_name.into(), builder, params)
    }

    /// Register an endpoint builder under a type name
    ///
    /// Same contract as [`register_listener`](Self::register_listener).
    pub fn register_endpoint(
        &self,
        type_name: impl Into<String>,
        builder: Builder,
        params: Parameters,
    ) -> Result<(), HubError> {
        register(&self.endpoints, Capability::Endpoint, type_name.into(), builder, params)
    }

    // ── membership & description ─────────────────────────────────

    /// Check whether a listener type is registered; builds nothing
    pub fn is_listener_registered(&self, type_name: &str) -> bool {
        self.listeners.read().entries.contains_key(type_name)
    }

    /// Check whether an endpoint type is registered; builds nothing
    pub fn is_endpoint_registered(&self, type_name: &str) -> bool {
        self.endpoints.read().entries.contains_key(type_name)
    }

    /// The parameter descriptors of a listener type
    pub fn describe_listener(&self, type_name: &str) -> Result<Parameters, HubError> {
        describe(&self.listeners, Capability::Listener, type_name)
    }

    /// The parameter descriptors of an endpoint type
    pub fn describe_endpoint(&self, type_name: &str) -> Result<Parameters, HubError> {
        describe(&self.endpoints, Capability::Endpoint, type_name)
    }

    /// Registered listener type names, for management surfaces
    pub fn listener_types(&self) -> Vec<String> {
        self.listeners.read().parameters.keys().cloned().collect()
    }

    /// Registered endpoint type names, for management surfaces
    pub fn endpoint_types(&self) -> Vec<String> {
        self.endpoints.read().parameters.keys().cloned().collect()
    }

    // ── get-or-create ────────────────────────────────────────────

    /// Return or create the Listener identified by `uid`
    ///
    /// Validates `raw_config` against the type's declared parameters, then
    /// resolves uid-first/type-fallback and builds at most once per uid.
    /// Repeated calls with the same uid are side-effect-free after the
    /// first and return the identical instance.
    pub fn listener_by_name(
        &self,
        uid: &str,
        type_name: &str,
        raw_config: &HashMap<String, String>,
    ) -> Result<Arc<dyn Listener>, HubError> {
        match by_name(&self.listeners, Capability::Listener, uid, type_name, raw_config)? {
            Component::Listener(l) => Ok(l),
            Component::Endpoint(_) => Err(HubError::CapabilityMismatch {
                uid: uid.to_string(),
                type_name: type_name.to_string(),
                expected: Capability::Listener,
            }),
        }
    }

    /// Return or create the Endpoint identified by `uid`
    ///
    /// Same contract as [`listener_by_name`](Self::listener_by_name).
    pub fn endpoint_by_name(
        &self,
        uid: &str,
        type_name: &str,
        raw_config: &HashMap<String, String>,
    ) -> Result<Arc<dyn Endpoint>, HubError> {
        match by_name(&self.endpoints, Capability::Endpoint, uid, type_name, raw_config)? {
            Component::Endpoint(e) => Ok(e),
            Component::Listener(_) => Err(HubError::CapabilityMismatch {
                uid: uid.to_string(),
                type_name: type_name.to_string(),
                expected: Capability::Endpoint,
            }),
        }
    }

    // ── eviction ─────────────────────────────────────────────────

    /// Drop the cached build outcome for a listener uid
    ///
    /// The next lookup runs the builder again. Returns whether anything
    /// was evicted. This is the escape hatch for a uid wedged by a cached
    /// build failure.
    pub fn evict_listener(&self, uid: &str) -> bool {
        evict(&self.listeners, Capability::Listener, uid)
    }

    /// Drop the cached build outcome for an endpoint uid
    pub fn evict_endpoint(&self, uid: &str) -> bool {
        evict(&self.endpoints, Capability::Endpoint, uid)
    }

    // ── built-instance access (management / shutdown) ────────────

    /// All endpoint instances built so far, one per uid
    ///
    /// Used at shutdown to fan out [`Endpoint::shutdown`] and by
    /// management surfaces; resolves nothing.
    pub fn built_endpoints(&self) -> Vec<Arc<dyn Endpoint>> {
        self.endpoints
            .read()
            .entries
            .values()
            .filter_map(|entry| match &entry.built {
                Some(Built::Ready(Component::Endpoint(e))) => Some(Arc::clone(e)),
                _ => None,
            })
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn register(
    table: &RwLock<Table>,
    capability: Capability,
    type_name: String,
    builder: Builder,
    params: Parameters,
) -> Result<(), HubError> {
    if params.is_empty() {
        return Err(HubError::EmptyParameters {
            capability,
            type_name,
        });
    }

    let mut table = table.write();
    if table.entries.contains_key(&type_name) {
        warn!(%capability, type_name = %type_name, "replacing previously registered builder");
    }
    table.entries.insert(
        type_name.clone(),
        Entry {
            builder,
            built: None,
        },
    );
    table.parameters.insert(type_name.clone(), params);
    info!(%capability, type_name = %type_name, "registered component type");
    Ok(())
}

fn describe(
    table: &RwLock<Table>,
    capability: Capability,
    type_name: &str,
) -> Result<Parameters, HubError> {
    table
        .read()
        .parameters
        .get(type_name)
        .cloned()
        .ok_or_else(|| HubError::UnknownType {
            capability,
            type_name: type_name.to_string(),
        })
}

fn evict(table: &RwLock<Table>, capability: Capability, uid: &str) -> bool {
    let mut table = table.write();
    match table.entries.get_mut(uid) {
        Some(entry) if entry.built.is_some() => {
            entry.built = None;
            info!(%capability, uid = %uid, "evicted cached instance");
            true
        }
        _ => false,
    }
}

/// The lookup-or-build routine shared by both capabilities
///
/// Holding the write lock across the builder call is what makes "exactly
/// one build per uid" hold: concurrent first-access callers serialize here
/// and all but one observe the cached outcome. Builders are plain
/// synchronous constructors, so the hold is short.
fn by_name(
    table: &RwLock<Table>,
    capability: Capability,
    uid: &str,
    type_name: &str,
    raw_config: &HashMap<String, String>,
) -> Result<Component, HubError> {
    let parameters = describe(table, capability, type_name)?;
    let values = Values::new(raw_config, &parameters)?;

    let mut table = table.write();

    // uid first, then type
    let entry = table
        .entries
        .get(uid)
        .or_else(|| table.entries.get(type_name))
        .ok_or_else(|| HubError::BuilderNotFound {
            uid: uid.to_string(),
            type_name: type_name.to_string(),
        })?;

    // already built (or already failed): return the cached outcome unchanged
    if let Some(built) = &entry.built {
        return match built {
            Built::Ready(component) => Ok(component.clone()),
            Built::Failed(e) => Err(HubError::Build {
                uid: uid.to_string(),
                source: e.clone(),
            }),
        };
    }

    let builder = Arc::clone(&entry.builder);
    let outcome = builder(&values);

    let built = match &outcome {
        Ok(component) => Built::Ready(component.clone()),
        Err(e) => Built::Failed(e.clone()),
    };
    table.entries.insert(
        uid.to_string(),
        Entry {
            builder,
            built: Some(built),
        },
    );

    match outcome {
        Ok(component) => {
            debug!(%capability, uid = %uid, type_name = %type_name, "built component instance");
            Ok(component)
        }
        Err(e) => {
            error!(%capability, uid = %uid, type_name = %type_name, error = %e, "builder failed; failure cached");
            Err(HubError::Build {
                uid: uid.to_string(),
                source: e,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::describe::{ParamKind, Parameter};
    use async_trait::async_trait;
    use keskus_core::{channel, Channel, Message};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullListener {
        label: String,
    }

    impl Listener for NullListener {
        fn name(&self) -> &str {
            &self.label
        }

        fn new_channel(&self, _selector: &str) -> Result<Channel, ComponentError> {
            let (consumer, _source) = channel(1);
            Ok(consumer)
        }
    }

    struct NullEndpoint;

    #[async_trait]
    impl Endpoint for NullEndpoint {
        fn name(&self) -> &str {
            "null"
        }

        async fn deliver(&self, _messages: &[Message]) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    fn params() -> Parameters {
        vec![Parameter::required(
            "broker",
            "Broker address",
            ParamKind::String,
        )]
    }

    fn config() -> HashMap<String, String> {
        let mut raw = HashMap::new();
        raw.insert("broker".to_string(), "tcp://localhost".to_string());
        raw
    }

    fn listener_builder() -> Builder {
        Arc::new(|values| {
            Ok(Component::Listener(Arc::new(NullListener {
                label: values.get_str("broker").unwrap_or("?").to_string(),
            })))
        })
    }

    fn endpoint_builder() -> Builder {
        Arc::new(|_values| Ok(Component::Endpoint(Arc::new(NullEndpoint))))
    }

    #[test]
    fn register_then_describe_round_trips() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();

        assert!(registry.is_listener_registered("mqtt"));
        assert!(!registry.is_listener_registered("amqp"));
        assert!(!registry.is_endpoint_registered("mqtt"));

        let described = registry.describe_listener("mqtt").unwrap();
        assert_eq!(described, params());
    }

    #[test]
    fn empty_parameters_are_rejected_and_type_stays_unregistered() {
        let registry = Registry::new();
        let err = registry
            .register_endpoint("stdout", endpoint_builder(), vec![])
            .unwrap_err();

        assert!(matches!(err, HubError::EmptyParameters { .. }));
        assert!(!registry.is_endpoint_registered("stdout"));
        assert!(registry.describe_endpoint("stdout").is_err());
    }

    #[test]
    fn describe_unknown_type_names_it() {
        let registry = Registry::new();
        let err = registry.describe_listener("missing").unwrap_err();
        match err {
            HubError::UnknownType { type_name, .. } => assert_eq!(type_name, "missing"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn by_name_builds_once_and_caches_by_uid() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_builder = Arc::clone(&calls);

        let builder: Builder = Arc::new(move |_values| {
            calls_in_builder.fetch_add(1, Ordering::SeqCst);
            Ok(Component::Listener(Arc::new(NullListener {
                label: "counted".to_string(),
            })))
        });
        registry.register_listener("mqtt", builder, params()).unwrap();

        let first = registry.listener_by_name("pipe-1", "mqtt", &config()).unwrap();
        let second = registry.listener_by_name("pipe-1", "mqtt", &config()).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_uids_get_distinct_instances() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();

        let a = registry.listener_by_name("pipe-a", "mqtt", &config()).unwrap();
        let b = registry.listener_by_name("pipe-b", "mqtt", &config()).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn uid_equal_to_type_acts_as_shared_singleton() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();

        // Built under the type key itself: later type-fallback lookups for
        // *that same uid* observe the cached instance.
        let shared = registry.listener_by_name("mqtt", "mqtt", &config()).unwrap();
        let again = registry.listener_by_name("mqtt", "mqtt", &config()).unwrap();
        assert!(Arc::ptr_eq(&shared, &again));
    }

    #[test]
    fn lookup_with_unregistered_type_fails_before_builder_lookup() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();

        let err = registry
            .listener_by_name("pipe-1", "amqp", &config())
            .err()
            .unwrap();
        assert!(matches!(err, HubError::UnknownType { .. }));
    }

    #[test]
    fn validation_error_builds_nothing() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_builder = Arc::clone(&calls);
        let builder: Builder = Arc::new(move |_values| {
            calls_in_builder.fetch_add(1, Ordering::SeqCst);
            Ok(Component::Listener(Arc::new(NullListener {
                label: "x".to_string(),
            })))
        });
        registry.register_listener("mqtt", builder, params()).unwrap();

        let err = registry
            .listener_by_name("pipe-1", "mqtt", &HashMap::new())
            .err()
            .unwrap();

        match err {
            HubError::Validation(e) => assert!(e.to_string().contains("broker")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn capability_mismatch_is_reported_not_cast() {
        let registry = Registry::new();
        // A builder in the listener table that produces an endpoint.
        registry
            .register_listener("confused", endpoint_builder(), params())
            .unwrap();

        let err = registry
            .listener_by_name("pipe-1", "confused", &config())
            .err()
            .unwrap();
        match err {
            HubError::CapabilityMismatch { expected, .. } => {
                assert_eq!(expected, Capability::Listener);
            }
            other => panic!("expected capability mismatch, got {other:?}"),
        }
    }

    #[test]
    fn failed_build_is_cached_until_evicted() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_builder = Arc::clone(&calls);

        let builder: Builder = Arc::new(move |_values| {
            let n = calls_in_builder.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(ComponentError::Connection("transient".to_string()))
            } else {
                Ok(Component::Endpoint(Arc::new(NullEndpoint)))
            }
        });
        registry.register_endpoint("http", builder, params()).unwrap();

        // First lookup fails and caches the failure.
        let err = registry
            .endpoint_by_name("sink-1", "http", &config())
            .err()
            .unwrap();
        assert!(matches!(err, HubError::Build { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second lookup observes the cached failure without retrying.
        let err = registry
            .endpoint_by_name("sink-1", "http", &config())
            .err()
            .unwrap();
        assert!(matches!(err, HubError::Build { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Eviction un-wedges the uid; the builder runs again and succeeds.
        assert!(registry.evict_endpoint("sink-1"));
        let built = registry.endpoint_by_name("sink-1", "http", &config());
        assert!(built.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn evicting_an_unbuilt_uid_is_a_no_op() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();
        assert!(!registry.evict_listener("never-built"));
    }

    #[test]
    fn reregistration_replaces_the_builder() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();

        let replacement: Builder = Arc::new(|_values| {
            Ok(Component::Listener(Arc::new(NullListener {
                label: "replacement".to_string(),
            })))
        });
        let new_params = vec![Parameter::required("url", "Broker url", ParamKind::String)];
        registry
            .register_listener("mqtt", replacement, new_params.clone())
            .unwrap();

        assert_eq!(registry.describe_listener("mqtt").unwrap(), new_params);

        let mut raw = HashMap::new();
        raw.insert("url".to_string(), "tcp://other".to_string());
        let built = registry.listener_by_name("pipe-1", "mqtt", &raw).unwrap();
        assert_eq!(built.name(), "replacement");
    }

    #[test]
    fn concurrent_first_access_builds_exactly_once() {
        let registry = Arc::new(Registry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_builder = Arc::clone(&calls);

        let builder: Builder = Arc::new(move |_values| {
            calls_in_builder.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(Component::Listener(Arc::new(NullListener {
                label: "raced".to_string(),
            })))
        });
        registry.register_listener("mqtt", builder, params()).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry
                    .listener_by_name("shared", "mqtt", &config())
                    .unwrap()
            }));
        }

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for pair in instances.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn built_endpoints_lists_one_per_uid() {
        let registry = Registry::new();
        registry
            .register_endpoint("http", endpoint_builder(), params())
            .unwrap();

        assert!(registry.built_endpoints().is_empty());

        registry.endpoint_by_name("sink-1", "http", &config()).unwrap();
        registry.endpoint_by_name("sink-2", "http", &config()).unwrap();
        registry.endpoint_by_name("sink-1", "http", &config()).unwrap();

        assert_eq!(registry.built_endpoints().len(), 2);
    }

    #[test]
    fn type_listings_cover_both_tables() {
        let registry = Registry::new();
        registry
            .register_listener("mqtt", listener_builder(), params())
            .unwrap();
        registry
            .register_endpoint("http", endpoint_builder(), params())
            .unwrap();

        assert_eq!(registry.listener_types(), vec!["mqtt".to_string()]);
        assert_eq!(registry.endpoint_types(), vec!["http".to_string()]);
    }
}
