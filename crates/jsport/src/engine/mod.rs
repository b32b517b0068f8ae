//! The embedded engine as seen by the bridge.
//!
//! The bridge treats the engine as an injected capability: an
//! [`EngineService`] hands out one [`EngineHandle`] per extension instance and
//! owns whatever process-wide state the engine keeps. Evaluation is a blocking
//! call; a long-running script occupies the instance until it returns.
//!
//! The production service is
//! [`QuickJsService`](crate::engine::quickjs::QuickJsService) (feature
//! `quickjs`). Tests inject mocks or in-memory fakes.

#[cfg(feature = "quickjs")]
pub mod quickjs;

use jsport_config::ErrorDetection;
use thiserror::Error;

/// Literal that marks a serialized result as an engine error envelope.
pub const ERROR_ENVELOPE_MARKER: &str = "{\"error\"";

/// Factory and process-wide owner of engine instances.
pub trait EngineService {
    /// Per-instance handle type.
    type Handle: EngineHandle;

    /// Creates one engine instance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine cannot allocate its runtime.
    /// The bridge treats this as fatal to the instance.
    fn initialize(&self) -> Result<Self::Handle, EngineError>;

    /// Releases process-wide engine resources.
    ///
    /// The bridge calls this at most once per process, after the requesting
    /// instance has stopped its handle.
    fn shutdown(&self);
}

/// One engine instance owned by one extension instance.
pub trait EngineHandle {
    /// Evaluates `code` and returns the JSON serialization of its value.
    ///
    /// Failures are reported in-band as an error envelope, a JSON object
    /// whose top-level key is `"error"`.
    fn eval_serialized(&mut self, filename: &str, code: &str) -> String;

    /// Evaluates `code` for its side effects.
    ///
    /// # Errors
    ///
    /// Returns the engine's failure message when evaluation throws.
    fn eval_discard(&mut self, filename: &str, code: &str) -> Result<(), String>;

    /// Releases the instance's resources. Called once, at detach.
    fn stop(&mut self);
}

/// Failures raised by an engine service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine runtime could not be created.
    #[error("failed to initialise engine: {message}")]
    Initialise {
        /// Engine-provided description.
        message: String,
    },
}

/// Substring test for the error envelope marker.
///
/// Any serialized value containing `{"error"` matches, including a string
/// value that merely embeds that text. This mirrors the behaviour hosts
/// already depend on; see [`ErrorDetection::Structural`] for the strict form.
#[must_use]
pub fn looks_like_error_envelope(text: &str) -> bool {
    text.contains(ERROR_ENVELOPE_MARKER)
}

/// Structural test: `text` parses as a JSON object with an `"error"` key.
#[must_use]
pub fn is_structural_error_envelope(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .as_ref()
        .and_then(serde_json::Value::as_object)
        .is_some_and(|object| object.contains_key("error"))
}

/// Classifies a serialized result with the configured strategy.
#[must_use]
pub fn is_error_envelope(detection: ErrorDetection, text: &str) -> bool {
    match detection {
        ErrorDetection::Substring => looks_like_error_envelope(text),
        ErrorDetection::Structural => is_structural_error_envelope(text),
    }
}
