//! One extension instance: decode, dispatch, respond.
//!
//! A [`Bridge`] is created when the host attaches and owns the instance's
//! engine for its whole life. Each request buffer is decoded, dispatched and
//! answered with exactly one framed term before the next is read.
//! [`Bridge::detach`] (or dropping the bridge) stops the engine and performs
//! any process-wide teardown requested by a `shutdown` command.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use jsport_config::{ErrorDetection, JsportConfig};
use thiserror::Error;

use crate::dispatch::Dispatcher;
use crate::engine::EngineService;
use crate::lifecycle::{EngineLifecycle, LifecycleError, LifecyclePhase, ProcessTeardown, StopReport};
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::response::{Outcome, ResponseError, ResponseWriter};
use crate::wire::{Command, WireError};

/// Errors that end an extension instance.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine could not be started at attach.
    #[error("failed to start engine: {0}")]
    EngineStart(#[source] LifecycleError),

    /// A request violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] WireError),

    /// A response could not be delivered.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// Collaborators shared by instances in one process.
#[derive(Clone)]
pub struct BridgeOptions {
    detection: ErrorDetection,
    teardown: Arc<ProcessTeardown>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl BridgeOptions {
    /// Options derived from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &JsportConfig) -> Self {
        Self::default().with_error_detection(config.error_detection())
    }

    /// Sets the error envelope detection strategy.
    #[must_use]
    pub const fn with_error_detection(mut self, detection: ErrorDetection) -> Self {
        self.detection = detection;
        self
    }

    /// Replaces the process teardown guard.
    #[must_use]
    pub fn with_teardown(mut self, teardown: Arc<ProcessTeardown>) -> Self {
        self.teardown = teardown;
        self
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Configured detection strategy.
    #[must_use]
    pub const fn error_detection(&self) -> ErrorDetection {
        self.detection
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            detection: ErrorDetection::default(),
            teardown: ProcessTeardown::process(),
            reporter: Arc::new(StructuredLifecycleReporter::new()),
        }
    }
}

impl fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("detection", &self.detection)
            .field("teardown", &self.teardown)
            .finish_non_exhaustive()
    }
}

/// An attached extension instance.
pub struct Bridge<S: EngineService, W: Write> {
    lifecycle: EngineLifecycle<S>,
    dispatcher: Dispatcher,
    writer: ResponseWriter<W>,
}

impl<S: EngineService, W: Write> Bridge<S, W> {
    /// Attaches a new instance and starts its engine.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::EngineStart`] when the engine cannot be created.
    pub fn attach(service: S, output: W, options: BridgeOptions) -> Result<Self, BridgeError> {
        let BridgeOptions {
            detection,
            teardown,
            reporter,
        } = options;
        let mut lifecycle = EngineLifecycle::with_collaborators(service, teardown, reporter);
        lifecycle.start().map_err(BridgeError::EngineStart)?;
        Ok(Self {
            lifecycle,
            dispatcher: Dispatcher::new(detection),
            writer: ResponseWriter::new(output),
        })
    }

    /// Decodes one request buffer, executes it and writes its response.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Protocol`] for a malformed request, in which
    /// case nothing is written, or [`BridgeError::Response`] when the
    /// response cannot be delivered.
    pub fn process(&mut self, request: &[u8]) -> Result<Outcome, BridgeError> {
        let command = Command::decode(request)?;
        let outcome = self.dispatch(&command);
        self.writer.write_outcome(&outcome)?;
        Ok(outcome)
    }

    /// Executes a decoded command without writing a response.
    pub fn dispatch(&mut self, command: &Command<'_>) -> Outcome {
        self.dispatcher.dispatch(command, &mut self.lifecycle)
    }

    /// Whether a `shutdown` command has been received.
    #[must_use]
    pub const fn shutdown_requested(&self) -> bool {
        self.lifecycle.shutdown_requested()
    }

    /// Current engine phase.
    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Borrows the output channel.
    #[must_use]
    pub const fn output(&self) -> &W {
        self.writer.get_ref()
    }

    /// Stops the engine and performs any requested process-wide teardown.
    pub fn detach(mut self) -> StopReport {
        self.lifecycle.stop()
    }
}

impl<S: EngineService, W: Write> fmt::Debug for Bridge<S, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("lifecycle", &self.lifecycle)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
