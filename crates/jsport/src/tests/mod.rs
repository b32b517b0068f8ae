//! Shared test support for the port bridge.
//!
//! [`FakeService`] hands out in-memory engines that understand a tiny script
//! language, enough to observe state persistence and error paths without
//! linking a real engine:
//!
//! - `throw <message>` fails with `message`;
//! - `let <name> = <json>` stores a global and evaluates to `undefined`;
//! - `<name>` evaluates to a stored global;
//! - anything else evaluates to itself, taken as JSON text.

mod behaviour;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{EngineError, EngineHandle, EngineService};
use crate::reporter::LifecycleReporter;

/// Builds a request buffer from a tag and length-prefixed arguments.
pub(crate) fn request(tag: &[u8; 2], arguments: &[&str]) -> Vec<u8> {
    let mut buffer = tag.to_vec();
    for argument in arguments {
        let len = u32::try_from(argument.len()).expect("argument fits u32");
        buffer.extend_from_slice(&len.to_be_bytes());
        buffer.extend_from_slice(argument.as_bytes());
    }
    buffer
}

/// Calls observed by a [`FakeService`] and its handles.
#[derive(Debug, Default)]
pub(crate) struct EngineLog {
    pub(crate) initialised: usize,
    pub(crate) stopped: usize,
    pub(crate) shutdowns: usize,
    pub(crate) evaluations: Vec<(String, String)>,
}

/// In-memory engine service sharing one [`EngineLog`] with its handles.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeService {
    log: Arc<Mutex<EngineLog>>,
    fail_start: bool,
}

impl FakeService {
    /// A service whose `initialize` always fails.
    pub(crate) fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Locks the shared call log.
    pub(crate) fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().expect("engine log lock")
    }
}

impl EngineService for FakeService {
    type Handle = FakeHandle;

    fn initialize(&self) -> Result<FakeHandle, EngineError> {
        if self.fail_start {
            return Err(EngineError::Initialise {
                message: String::from("out of memory"),
            });
        }
        self.log().initialised += 1;
        Ok(FakeHandle {
            log: Arc::clone(&self.log),
            globals: HashMap::new(),
        })
    }

    fn shutdown(&self) {
        self.log().shutdowns += 1;
    }
}

/// Engine instance created by [`FakeService`].
#[derive(Debug)]
pub(crate) struct FakeHandle {
    log: Arc<Mutex<EngineLog>>,
    globals: HashMap<String, String>,
}

enum Evaluation {
    Value(String),
    Undefined,
    Thrown(String),
}

impl FakeHandle {
    fn evaluate(&mut self, filename: &str, code: &str) -> Evaluation {
        self.log
            .lock()
            .expect("engine log lock")
            .evaluations
            .push((filename.to_owned(), code.to_owned()));
        let code = code.trim();
        if let Some(message) = code.strip_prefix("throw ") {
            return Evaluation::Thrown(message.to_owned());
        }
        if let Some(binding) = code.strip_prefix("let ") {
            let (name, value) = binding.split_once('=').expect("let binding has a value");
            self.globals
                .insert(name.trim().to_owned(), value.trim().to_owned());
            return Evaluation::Undefined;
        }
        self.globals
            .get(code)
            .cloned()
            .map_or_else(|| Evaluation::Value(code.to_owned()), Evaluation::Value)
    }
}

impl EngineHandle for FakeHandle {
    fn eval_serialized(&mut self, filename: &str, code: &str) -> String {
        match self.evaluate(filename, code) {
            Evaluation::Value(json) => json,
            Evaluation::Undefined => String::from("null"),
            Evaluation::Thrown(message) => serde_json::json!({
                "error": { "filename": filename, "message": message }
            })
            .to_string(),
        }
    }

    fn eval_discard(&mut self, filename: &str, code: &str) -> Result<(), String> {
        match self.evaluate(filename, code) {
            Evaluation::Value(_) | Evaluation::Undefined => Ok(()),
            Evaluation::Thrown(message) => Err(format!("{filename}: {message}")),
        }
    }

    fn stop(&mut self) {
        self.log.lock().expect("engine log lock").stopped += 1;
    }
}

/// Reporter that records lifecycle event names in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingReporter {
    /// Returns the events seen so far.
    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("reporter lock").clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().expect("reporter lock").push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn engine_starting(&self) {
        self.record("engine_starting");
    }

    fn engine_started(&self) {
        self.record("engine_started");
    }

    fn engine_start_failed(&self, _error: &EngineError) {
        self.record("engine_start_failed");
    }

    fn shutdown_requested(&self) {
        self.record("shutdown_requested");
    }

    fn engine_stopped(&self) {
        self.record("engine_stopped");
    }

    fn process_teardown(&self, ran: bool) {
        self.record(if ran {
            "process_teardown"
        } else {
            "process_teardown_skipped"
        });
    }
}
