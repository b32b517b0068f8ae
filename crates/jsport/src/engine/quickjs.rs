//! QuickJS-backed engine service.
//!
//! Each handle owns one QuickJS runtime and one full context, so globals
//! defined by one command stay visible to the next. QuickJS keeps no
//! process-wide state, so [`EngineService::shutdown`] only records the event.

use rquickjs::{CatchResultExt, Context, Runtime, Value};
use tracing::debug;

use jsport_config::JsportConfig;

use super::{EngineError, EngineHandle, EngineService};

const ENGINE_TARGET: &str = "jsport::engine";

/// Serialization returned for values without a JSON form, such as `undefined`.
const NO_JSON_VALUE: &str = "null";

/// Creates QuickJS runtimes with optional resource limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuickJsService {
    memory_limit: Option<usize>,
    max_stack_size: Option<usize>,
}

impl QuickJsService {
    /// Creates a service with QuickJS default limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            memory_limit: None,
            max_stack_size: None,
        }
    }

    /// Creates a service using the limits from `config`.
    #[must_use]
    pub fn from_config(config: &JsportConfig) -> Self {
        Self {
            memory_limit: config.memory_limit_bytes().map(saturating_usize),
            max_stack_size: config.max_stack_bytes().map(saturating_usize),
        }
    }

    /// Sets the heap limit in bytes.
    #[must_use]
    pub const fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl EngineService for QuickJsService {
    type Handle = QuickJsHandle;

    fn initialize(&self) -> Result<QuickJsHandle, EngineError> {
        let runtime = Runtime::new().map_err(|error| EngineError::Initialise {
            message: error.to_string(),
        })?;
        if let Some(limit) = self.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = self.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        let context = Context::full(&runtime).map_err(|error| EngineError::Initialise {
            message: error.to_string(),
        })?;
        debug!(
            target: ENGINE_TARGET,
            memory_limit = ?self.memory_limit,
            max_stack_size = ?self.max_stack_size,
            "created QuickJS runtime"
        );
        Ok(QuickJsHandle {
            context: Some(context),
            runtime: Some(runtime),
        })
    }

    fn shutdown(&self) {
        debug!(target: ENGINE_TARGET, "QuickJS holds no process-wide state");
    }
}

/// One QuickJS runtime and context.
pub struct QuickJsHandle {
    // Field order matters: the context is dropped before its runtime.
    context: Option<Context>,
    runtime: Option<Runtime>,
}

impl std::fmt::Debug for QuickJsHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QuickJsHandle")
            .field("running", &self.context.is_some())
            .finish()
    }
}

impl EngineHandle for QuickJsHandle {
    fn eval_serialized(&mut self, filename: &str, code: &str) -> String {
        let Some(context) = self.context.as_ref() else {
            return error_envelope(filename, "engine has been stopped");
        };
        context.with(|ctx| {
            let value = match ctx.eval::<Value<'_>, _>(code).catch(&ctx) {
                Ok(value) => value,
                Err(caught) => return error_envelope(filename, &caught.to_string()),
            };
            match ctx.json_stringify(value).catch(&ctx) {
                Ok(Some(text)) => text
                    .to_string()
                    .unwrap_or_else(|error| error_envelope(filename, &error.to_string())),
                Ok(None) => String::from(NO_JSON_VALUE),
                Err(caught) => error_envelope(filename, &caught.to_string()),
            }
        })
    }

    fn eval_discard(&mut self, filename: &str, code: &str) -> Result<(), String> {
        let Some(context) = self.context.as_ref() else {
            return Err(format!("{filename}: engine has been stopped"));
        };
        context.with(|ctx| {
            ctx.eval::<(), _>(code)
                .catch(&ctx)
                .map_err(|caught| format!("{filename}: {caught}"))
        })
    }

    fn stop(&mut self) {
        drop(self.context.take());
        if let Some(runtime) = self.runtime.take() {
            runtime.run_gc();
        }
    }
}

/// Builds `{"error":{"filename":...,"message":...}}`.
fn error_envelope(filename: &str, message: &str) -> String {
    serde_json::json!({
        "error": {
            "filename": filename,
            "message": message.trim_end(),
        }
    })
    .to_string()
}
