//! Structured reporting for engine lifecycle events.

use std::sync::Arc;

use crate::engine::EngineError;

/// Tracing target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = "jsport::lifecycle";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before the engine handle is requested.
    fn engine_starting(&self);

    /// Invoked once the engine handle is running.
    fn engine_started(&self);

    /// Invoked when the engine cannot be created.
    fn engine_start_failed(&self, error: &EngineError);

    /// Invoked when a `shutdown` command marks the instance.
    fn shutdown_requested(&self);

    /// Invoked after the engine handle has been released.
    fn engine_stopped(&self);

    /// Invoked after a process-wide teardown attempt; `ran` is false when an
    /// earlier instance already performed it.
    fn process_teardown(&self, ran: bool);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn engine_starting(&self) {
        (**self).engine_starting();
    }

    fn engine_started(&self) {
        (**self).engine_started();
    }

    fn engine_start_failed(&self, error: &EngineError) {
        (**self).engine_start_failed(error);
    }

    fn shutdown_requested(&self) {
        (**self).shutdown_requested();
    }

    fn engine_stopped(&self) {
        (**self).engine_stopped();
    }

    fn process_teardown(&self, ran: bool) {
        (**self).process_teardown(ran);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn engine_starting(&self) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "engine_starting",
            "starting engine"
        );
    }

    fn engine_started(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "engine_started",
            "engine running"
        );
    }

    fn engine_start_failed(&self, error: &EngineError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "engine_start_failed",
            error = %error,
            "engine failed to start"
        );
    }

    fn shutdown_requested(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_requested",
            "process-wide engine teardown requested for detach"
        );
    }

    fn engine_stopped(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "engine_stopped",
            "engine stopped"
        );
    }

    fn process_teardown(&self, ran: bool) {
        if ran {
            tracing::info!(
                target: LIFECYCLE_TARGET,
                event = "process_teardown",
                "released process-wide engine resources"
            );
        } else {
            tracing::debug!(
                target: LIFECYCLE_TARGET,
                event = "process_teardown_skipped",
                "process-wide engine resources already released"
            );
        }
    }
}
