//! Keskus Runtime — process wiring for the hub
//!
//! Provides [`run()`] for zero-boilerplate startup, and [`RuntimeBuilder`]
//! for callers who need to supply their own store.
//!
//! # Quick start
//!
//! ```ignore
//! use keskus_runtime::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     keskus_runtime::run(|registry, pipes| {
//!         registry.register_listener("mqtt", mqtt_builder(), mqtt_params())?;
//!         registry.register_endpoint("stdout", stdout_builder(), stdout_params())?;
//!         pipes.create_or_update(&my_pipe())?;
//!         Ok(())
//!     }).await
//! }
//! ```
//!
//! The closure registers component types and seeds pipes; the runtime then
//! loads every persisted pipe, spawns a runner per pipe, and waits for
//! SIGINT/SIGTERM. On shutdown every runner is signalled and joined, then
//! every built endpoint gets its `shutdown()` call.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod prelude;

use keskus_hub::config::{Config, LogFormat};
use keskus_hub::registry::Registry;
use keskus_hub::runner::PipeRunner;
use keskus_hub::store::{MemoryStore, PipeBucket, Store};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run a Keskus hub with default settings.
///
/// Loads configuration from environment variables, initialises tracing,
/// calls your closure to register components and seed pipes, then runs
/// every persisted pipe until shutdown.
pub async fn run<F>(configure: F) -> anyhow::Result<()>
where
    F: FnOnce(&Registry, &PipeBucket) -> anyhow::Result<()>,
{
    RuntimeBuilder::new().configure(configure).await
}

/// Builder for controlling runtime behaviour.
///
/// # Example
///
/// ```ignore
/// RuntimeBuilder::new()
///     .store(Arc::new(MyBoltStore::open("keskus.db")?))
///     .configure(|registry, pipes| {
///         registry.register_endpoint("stdout", stdout_builder(), stdout_params())?;
///         Ok(())
///     })
///     .await
/// ```
pub struct RuntimeBuilder {
    store: Option<Arc<dyn Store>>,
}

impl RuntimeBuilder {
    /// Create a new builder with defaults from environment variables.
    pub fn new() -> Self {
        Self { store: None }
    }

    /// Supply the bucket store backing pipe persistence.
    ///
    /// Default: an in-memory store (pipes must be re-seeded on restart).
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Configure the hub and run it to completion.
    ///
    /// This is the terminal method — it blocks until shutdown.
    pub async fn configure<F>(self, configure: F) -> anyhow::Result<()>
    where
        F: FnOnce(&Registry, &PipeBucket) -> anyhow::Result<()>,
    {
        // ── 1. Load config from env ──────────────────────────────
        let config = Config::from_env()?;

        // ── 2. Init tracing ──────────────────────────────────────
        init_tracing(&config);

        info!(
            pipes_bucket = %config.pipes_bucket,
            "Starting keskus"
        );

        // ── 3. Registry + store ──────────────────────────────────
        let registry = Registry::new();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let pipes = PipeBucket::with_bucket(store, config.pipes_bucket.clone());

        // ── 4. User registers components and seeds pipes ─────────
        configure(&registry, &pipes)?;

        // ── 5. Spawn a runner per persisted pipe ─────────────────
        let mut handles = Vec::new();
        for pipe in pipes.list()? {
            let uri = pipe.uri.clone();
            match PipeRunner::new(&registry, pipe) {
                Ok(runner) => {
                    info!(pipe = %uri, "pipe attached");
                    handles.push(runner.spawn());
                }
                Err(e) => {
                    error!(pipe = %uri, error = %e, "failed to attach pipe");
                }
            }
        }

        info!(pipes = handles.len(), "keskus running");

        // ── 6. Wait for shutdown ─────────────────────────────────
        shutdown_signal().await;

        // ── 7. Stop runners, then endpoints ──────────────────────
        for handle in &handles {
            handle.stop();
        }
        for handle in handles {
            if let Err(e) = handle.join().await {
                error!(error = %e, "pipe ended with error");
            }
        }

        for endpoint in registry.built_endpoints() {
            if let Err(e) = endpoint.shutdown().await {
                error!(endpoint = endpoint.name(), error = %e, "endpoint shutdown failed");
            }
        }

        info!("keskus shutdown complete");

        Ok(())
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialise the tracing subscriber based on config.
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
