//! Command dispatch.
//!
//! | Tag | Action | Outcome |
//! |---|---|---|
//! | `ej` | evaluate, serialize the value | `OkWithString`, or `ErrorWithString` for an error envelope |
//! | `dj` | evaluate, discard the value | `Ok` or `ErrorWithString` |
//! | `sd` | mark process teardown for detach | `Ok` |
//! | other | none | `UnknownCommand` |
//!
//! Evaluation failures never escape dispatch; they become outcomes.

use jsport_config::ErrorDetection;
use tracing::debug;

use crate::engine::{EngineHandle, EngineService, is_error_envelope};
use crate::lifecycle::{EngineLifecycle, LifecycleError};
use crate::response::Outcome;
use crate::wire::Command;

const DISPATCH_TARGET: &str = "jsport::dispatch";

/// Routes decoded commands to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatcher {
    detection: ErrorDetection,
}

impl Dispatcher {
    /// Creates a dispatcher using `detection` to classify `ej` results.
    #[must_use]
    pub const fn new(detection: ErrorDetection) -> Self {
        Self { detection }
    }

    /// Strategy used to recognise error envelopes.
    #[must_use]
    pub const fn detection(&self) -> ErrorDetection {
        self.detection
    }

    /// Executes one command against the instance's engine.
    pub fn dispatch<S>(&self, command: &Command<'_>, lifecycle: &mut EngineLifecycle<S>) -> Outcome
    where
        S: EngineService,
    {
        let outcome = match command {
            Command::EvalJson { filename, code } => self.eval_json(lifecycle, filename, code),
            Command::EvalDiscard { filename, code } => eval_discard(lifecycle, filename, code),
            Command::Shutdown => {
                lifecycle.request_shutdown();
                Outcome::Ok
            }
            Command::Unknown { .. } => Outcome::UnknownCommand,
        };
        debug!(
            target: DISPATCH_TARGET,
            tag = %command.tag(),
            outcome = outcome.kind(),
            "dispatched command"
        );
        outcome
    }

    fn eval_json<S>(&self, lifecycle: &mut EngineLifecycle<S>, filename: &str, code: &str) -> Outcome
    where
        S: EngineService,
    {
        let handle = match lifecycle.handle_mut() {
            Ok(handle) => handle,
            Err(error) => return not_running(&error),
        };
        let serialized = handle.eval_serialized(filename, code);
        if is_error_envelope(self.detection, &serialized) {
            debug!(
                target: DISPATCH_TARGET,
                filename,
                message_len = serialized.len(),
                "evaluation returned an error envelope"
            );
            Outcome::ErrorWithString(serialized)
        } else {
            Outcome::OkWithString(serialized)
        }
    }
}

fn eval_discard<S>(lifecycle: &mut EngineLifecycle<S>, filename: &str, code: &str) -> Outcome
where
    S: EngineService,
{
    let handle = match lifecycle.handle_mut() {
        Ok(handle) => handle,
        Err(error) => return not_running(&error),
    };
    match handle.eval_discard(filename, code) {
        Ok(()) => Outcome::Ok,
        Err(message) => {
            debug!(
                target: DISPATCH_TARGET,
                filename,
                message_len = message.len(),
                "evaluation failed"
            );
            Outcome::ErrorWithString(message)
        }
    }
}

fn not_running(error: &LifecycleError) -> Outcome {
    debug!(target: DISPATCH_TARGET, %error, "rejected evaluation");
    Outcome::ErrorWithString(error.to_string())
}
