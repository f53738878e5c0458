//! Pipe runner - executes one persisted pipe
//!
//! Resolves the pipe's listener and endpoints through the registry, opens a
//! channel with selector = the pipe's uri, and pumps:
//!
//! ```text
//! Channel ──► Script ──► Endpoint A
//!                   └──► Endpoint B   (fan-out, failures independent)
//! ```
//!
//! A delivery failure to one endpoint never blocks delivery to the others,
//! and a channel error never stops the pipe - both are logged, counted, and
//! pulled past. Only the stop signal (or the channel closing) ends the loop.

use crate::error::HubError;
use crate::pipe::Pipe;
use crate::registry::Registry;
use crate::script::{Passthrough, ScriptEngine, Transform};
use keskus_core::{metadata_keys, ChannelEvent, Endpoint, Listener, Message};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Live counters for one running pipe
///
/// Exposed to tests and management surfaces through [`RunnerHandle::stats`].
#[derive(Default)]
pub struct RunnerStats {
    delivered: AtomicU64,
    delivery_failures: AtomicU64,
    script_failures: AtomicU64,
    channel_errors: AtomicU64,
}

impl RunnerStats {
    /// Output messages successfully delivered, summed over endpoints
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Failed endpoint deliveries (one per failing batch per endpoint)
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Messages dropped because the script failed on them
    pub fn script_failures(&self) -> u64 {
        self.script_failures.load(Ordering::Relaxed)
    }

    /// Errors observed on the channel's error stream
    pub fn channel_errors(&self) -> u64 {
        self.channel_errors.load(Ordering::Relaxed)
    }
}

/// Orchestrates one pipe: listener channel → script → endpoint fan-out
pub struct PipeRunner {
    pipe: Pipe,
    listener: Arc<dyn Listener>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    transform: Arc<dyn Transform>,
    stats: Arc<RunnerStats>,
}

impl PipeRunner {
    /// Resolve a pipe's components through the registry
    ///
    /// Registry errors (unknown type, validation, cached build failure,
    /// capability mismatch) propagate; nothing starts running yet.
    pub fn new(registry: &Registry, pipe: Pipe) -> Result<Self, HubError> {
        let listener = registry.listener_by_name(
            &pipe.listener.uid,
            &pipe.listener.kind,
            &pipe.listener.config,
        )?;

        let mut endpoints = Vec::with_capacity(pipe.endpoints.len());
        for reference in &pipe.endpoints {
            endpoints.push(registry.endpoint_by_name(
                &reference.uid,
                &reference.kind,
                &reference.config,
            )?);
        }

        let transform: Arc<dyn Transform> = if pipe.profile.script.is_empty() {
            Arc::new(Passthrough)
        } else {
            Arc::new(ScriptEngine::compile(&pipe.profile.script)?)
        };

        Ok(Self {
            pipe,
            listener,
            endpoints,
            transform,
            stats: Arc::new(RunnerStats::default()),
        })
    }

    /// The resolved endpoints, in pipe order
    pub fn endpoints(&self) -> &[Arc<dyn Endpoint>] {
        &self.endpoints
    }

    /// Spawn the run loop, returning a handle to stop and join it
    pub fn spawn(self) -> RunnerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::clone(&self.stats);
        let join = tokio::spawn(self.run(stop_rx));
        RunnerHandle {
            stop: stop_tx,
            join,
            stats,
        }
    }

    /// Run until the stop signal fires or the channel closes
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> Result<(), HubError> {
        let mut channel = self
            .listener
            .new_channel(&self.pipe.uri)
            .map_err(HubError::Channel)?;

        info!(
            pipe = %self.pipe.uri,
            listener = self.listener.name(),
            endpoints = self.endpoints.len(),
            "pipe started"
        );

        channel.next();
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!(pipe = %self.pipe.uri, "pipe stopping");
                        break;
                    }
                }
                event = channel.recv() => {
                    match event {
                        None => {
                            info!(pipe = %self.pipe.uri, "channel closed, pipe stopping");
                            break;
                        }
                        Some(ChannelEvent::Error(e)) => {
                            self.stats.channel_errors.fetch_add(1, Ordering::Relaxed);
                            warn!(pipe = %self.pipe.uri, error = %e, "channel error");
                            channel.next();
                        }
                        Some(ChannelEvent::Item(msg)) => {
                            self.process(msg).await;
                            channel.next();
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Transform one message and fan the outputs out to every endpoint
    async fn process(&self, mut msg: Message) {
        msg.metadata_mut()
            .insert(metadata_keys::PIPE.to_string(), self.pipe.uri.clone());

        let outputs = match self.transform.apply(&msg) {
            Ok(outputs) => outputs,
            Err(e) => {
                self.stats.script_failures.fetch_add(1, Ordering::Relaxed);
                warn!(pipe = %self.pipe.uri, id = %msg.id, error = %e, "script failed, message dropped");
                return;
            }
        };

        if outputs.is_empty() {
            debug!(pipe = %self.pipe.uri, id = %msg.id, "script produced no outputs");
            return;
        }

        for endpoint in &self.endpoints {
            match endpoint.deliver(&outputs).await {
                Ok(()) => {
                    self.stats
                        .delivered
                        .fetch_add(outputs.len() as u64, Ordering::Relaxed);
                    debug!(
                        pipe = %self.pipe.uri,
                        endpoint = endpoint.name(),
                        count = outputs.len(),
                        "delivered"
                    );
                }
                Err(e) => {
                    self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        pipe = %self.pipe.uri,
                        endpoint = endpoint.name(),
                        error = %e,
                        count = outputs.len(),
                        "delivery failed"
                    );
                }
            }
        }
    }
}

/// Handle on a spawned pipe runner
pub struct RunnerHandle {
    stop: watch::Sender<bool>,
    join: tokio::task::JoinHandle<Result<(), HubError>>,
    stats: Arc<RunnerStats>,
}

impl RunnerHandle {
    /// Signal the run loop to stop; returns immediately
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Wait for the run loop to finish
    pub async fn join(self) -> Result<(), HubError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "pipe task failed");
                Ok(())
            }
        }
    }

    /// Live counters for this pipe
    pub fn stats(&self) -> Arc<RunnerStats> {
        Arc::clone(&self.stats)
    }
}
