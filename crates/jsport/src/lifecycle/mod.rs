//! Engine lifecycle management for one extension instance.
//!
//! An instance moves through `Uninitialized -> Running -> Stopped`. Starting
//! acquires one engine handle; stopping releases it and, when a `shutdown`
//! command was received, releases process-wide engine resources through a
//! [`ProcessTeardown`] guard that runs at most once per process.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle, EngineService};
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};

static PROCESS_TEARDOWN: Lazy<Arc<ProcessTeardown>> =
    Lazy::new(|| Arc::new(ProcessTeardown::new()));

/// Once-only guard around process-wide engine teardown.
#[derive(Debug, Default)]
pub struct ProcessTeardown {
    done: OnceCell<()>,
}

impl ProcessTeardown {
    /// Creates a guard that has not yet run.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            done: OnceCell::new(),
        }
    }

    /// Returns the guard shared by every instance in this process.
    #[must_use]
    pub fn process() -> Arc<Self> {
        Arc::clone(&PROCESS_TEARDOWN)
    }

    /// Runs `teardown` unless this guard has already run.
    ///
    /// Returns `true` when `teardown` was invoked by this call.
    pub fn run_once<F>(&self, teardown: F) -> bool
    where
        F: FnOnce(),
    {
        let mut ran = false;
        self.done.get_or_init(|| {
            teardown();
            ran = true;
        });
        ran
    }

    /// Reports whether the teardown has already run.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.done.get().is_some()
    }
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No engine handle has been requested yet.
    Uninitialized,
    /// The engine handle is live.
    Running,
    /// The engine handle has been released. Terminal.
    Stopped,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// Errors raised by lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The engine could not be started.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A transition was requested from a phase that does not allow it.
    #[error("cannot move engine from {from} to {to}")]
    InvalidTransition {
        /// Phase at the time of the request.
        from: LifecyclePhase,
        /// Requested phase.
        to: LifecyclePhase,
    },

    /// An evaluation was attempted while the engine was not running.
    #[error("engine is not running (phase: {phase})")]
    NotRunning {
        /// Phase at the time of the request.
        phase: LifecyclePhase,
    },
}

/// What happened to process-wide resources when an instance stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// No `shutdown` command was received.
    #[default]
    NotRequested,
    /// This instance ran the process-wide teardown.
    Performed,
    /// Teardown was requested but an earlier instance already ran it.
    AlreadyPerformed,
}

/// Summary of a [`EngineLifecycle::stop`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Whether this call released a running engine handle.
    pub handle_released: bool,
    /// Process-wide teardown result.
    pub teardown: TeardownOutcome,
}

enum EngineState<H> {
    Uninitialized,
    Running(H),
    Stopped,
}

/// Owns one engine handle and drives its lifecycle.
///
/// Dropping the manager stops the engine if it is still running.
pub struct EngineLifecycle<S: EngineService> {
    service: S,
    state: EngineState<S::Handle>,
    shutdown_requested: bool,
    teardown: Arc<ProcessTeardown>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl<S: EngineService> EngineLifecycle<S> {
    /// Creates a manager using the process-wide teardown guard and the
    /// structured reporter.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self::with_collaborators(
            service,
            ProcessTeardown::process(),
            Arc::new(StructuredLifecycleReporter::new()),
        )
    }

    /// Creates a manager with explicit collaborators.
    #[must_use]
    pub fn with_collaborators(
        service: S,
        teardown: Arc<ProcessTeardown>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        Self {
            service,
            state: EngineState::Uninitialized,
            shutdown_requested: false,
            teardown,
            reporter,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        match self.state {
            EngineState::Uninitialized => LifecyclePhase::Uninitialized,
            EngineState::Running(_) => LifecyclePhase::Running,
            EngineState::Stopped => LifecyclePhase::Stopped,
        }
    }

    /// Acquires the engine handle.
    ///
    /// A failed start leaves the manager in [`LifecyclePhase::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the manager is
    /// uninitialised, or [`LifecycleError::Engine`] when the service cannot
    /// create a handle.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        let phase = self.phase();
        if phase != LifecyclePhase::Uninitialized {
            return Err(LifecycleError::InvalidTransition {
                from: phase,
                to: LifecyclePhase::Running,
            });
        }
        self.reporter.engine_starting();
        match self.service.initialize() {
            Ok(handle) => {
                self.state = EngineState::Running(handle);
                self.reporter.engine_started();
                Ok(())
            }
            Err(error) => {
                self.state = EngineState::Stopped;
                self.reporter.engine_start_failed(&error);
                Err(LifecycleError::Engine(error))
            }
        }
    }

    /// Borrows the running engine handle.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotRunning`] outside
    /// [`LifecyclePhase::Running`].
    pub fn handle_mut(&mut self) -> Result<&mut S::Handle, LifecycleError> {
        let phase = self.phase();
        match &mut self.state {
            EngineState::Running(handle) => Ok(handle),
            EngineState::Uninitialized | EngineState::Stopped => {
                Err(LifecycleError::NotRunning { phase })
            }
        }
    }

    /// Marks process-wide teardown as pending for [`Self::stop`].
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
        self.reporter.shutdown_requested();
    }

    /// Whether a `shutdown` command has been received.
    #[must_use]
    pub const fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Releases the engine handle and any requested process-wide resources.
    ///
    /// Calling `stop` on a stopped manager does nothing.
    pub fn stop(&mut self) -> StopReport {
        let previous = std::mem::replace(&mut self.state, EngineState::Stopped);
        let handle_released = match previous {
            EngineState::Running(mut handle) => {
                handle.stop();
                drop(handle);
                self.reporter.engine_stopped();
                true
            }
            EngineState::Uninitialized => false,
            EngineState::Stopped => return StopReport::default(),
        };
        StopReport {
            handle_released,
            teardown: self.release_process_resources(),
        }
    }

    fn release_process_resources(&self) -> TeardownOutcome {
        if !self.shutdown_requested {
            return TeardownOutcome::NotRequested;
        }
        let service = &self.service;
        let ran = self.teardown.run_once(|| service.shutdown());
        self.reporter.process_teardown(ran);
        if ran {
            TeardownOutcome::Performed
        } else {
            TeardownOutcome::AlreadyPerformed
        }
    }
}

impl<S: EngineService> Drop for EngineLifecycle<S> {
    fn drop(&mut self) {
        if self.phase() != LifecyclePhase::Stopped {
            self.stop();
        }
    }
}

impl<S: EngineService> fmt::Debug for EngineLifecycle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLifecycle")
            .field("phase", &self.phase())
            .field("shutdown_requested", &self.shutdown_requested)
            .field("teardown_run", &self.teardown.has_run())
            .finish_non_exhaustive()
    }
}
