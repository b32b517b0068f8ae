//! A port program that evaluates JavaScript on behalf of an Erlang host.
//!
//! The host opens `jsport` with `{packet, 4}` framing and sends binary
//! commands:
//!
//! - `ej`: evaluate a script and return its JSON serialization;
//! - `dj`: evaluate a script for its side effects;
//! - `sd`: release process-wide engine resources when the instance detaches.
//!
//! Every command is answered with one External Term Format message: `ok`,
//! `{ok, Binary}`, `{error, Binary}` or `{error, unknown_command}`.
//!
//! The crate is layered bottom-up: [`wire`] decodes frames and requests,
//! [`engine`] abstracts the embedded JavaScript engine, [`lifecycle`] owns one
//! engine instance, [`dispatch`] maps commands to outcomes, [`response`] and
//! [`term`] encode those outcomes, [`bridge`] ties them together for one
//! instance, and [`port`] runs the process loop.

pub mod bridge;
pub mod dispatch;
pub mod engine;
pub mod lifecycle;
pub mod port;
pub mod reporter;
pub mod response;
pub mod telemetry;
pub mod term;
pub mod wire;

pub use bridge::{Bridge, BridgeError, BridgeOptions};
pub use dispatch::Dispatcher;
pub use engine::{
    EngineError, EngineHandle, EngineService, is_error_envelope, looks_like_error_envelope,
};
pub use lifecycle::{
    EngineLifecycle, LifecycleError, LifecyclePhase, ProcessTeardown, StopReport, TeardownOutcome,
};
pub use port::{ConfigLoader, OrthoConfigLoader, PortError, load_config, run_with};
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use response::{Outcome, ResponseError, ResponseWriter};
pub use wire::{Command, CommandTag, WireError};

#[cfg(feature = "quickjs")]
pub use port::run;

#[cfg(test)]
mod tests;
