//! Shared configuration for the `jsport` bridge.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, an optional
//! TOML file (`--config-path` or `JSPORT_CONFIG_PATH`), `JSPORT_*` environment
//! variables, and finally command-line flags. The host normally passes flags
//! through the `args` option of `open_port/2`, so every field is reachable from
//! the command line as well.

mod choices;
mod defaults;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use choices::{ErrorDetection, ErrorDetectionParseError, LogFormat, LogFormatParseError};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, default_error_detection, default_log_filter,
    default_log_filter_string, default_log_format, default_max_frame_bytes,
};

/// Largest frame length expressible by the `{packet, 4}` length prefix.
const MAX_PACKET_LENGTH: u64 = 0xFFFF_FFFF;

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "JSPORT")]
pub struct JsportConfig {
    /// Tracing filter expression, for example `info` or `jsport=debug`.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    log_filter: String,
    /// Log record format: `json` or `compact`.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    log_format: LogFormat,
    /// Largest accepted request frame in bytes.
    #[serde(default = "defaults::default_max_frame_bytes")]
    #[ortho_config(default = defaults::default_max_frame_bytes())]
    max_frame_bytes: u64,
    /// Engine heap limit in bytes; unlimited when absent.
    #[serde(default)]
    memory_limit_bytes: Option<u64>,
    /// Engine native stack limit in bytes; engine default when absent.
    #[serde(default)]
    max_stack_bytes: Option<u64>,
    /// Error envelope detection: `substring` or `structural`.
    #[serde(default = "defaults::default_error_detection")]
    #[ortho_config(default = defaults::default_error_detection())]
    error_detection: ErrorDetection,
}

impl Default for JsportConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_frame_bytes: default_max_frame_bytes(),
            memory_limit_bytes: None,
            max_stack_bytes: None,
            error_detection: default_error_detection(),
        }
    }
}

impl JsportConfig {
    /// Tracing filter expression applied to the stderr subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Largest request frame the port will accept, in bytes.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> u64 {
        self.max_frame_bytes
    }

    /// Heap limit handed to the engine runtime, if any.
    #[must_use]
    pub const fn memory_limit_bytes(&self) -> Option<u64> {
        self.memory_limit_bytes
    }

    /// Native stack limit handed to the engine runtime, if any.
    #[must_use]
    pub const fn max_stack_bytes(&self) -> Option<u64> {
        self.max_stack_bytes
    }

    /// Strategy used to recognise error envelopes in serialized results.
    #[must_use]
    pub const fn error_detection(&self) -> ErrorDetection {
        self.error_detection
    }

    /// Replaces the log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Replaces the frame size limit.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, limit: u64) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Sets the engine heap limit.
    #[must_use]
    pub const fn with_memory_limit_bytes(mut self, limit: Option<u64>) -> Self {
        self.memory_limit_bytes = limit;
        self
    }

    /// Sets the engine stack limit.
    #[must_use]
    pub const fn with_max_stack_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_stack_bytes = limit;
        self
    }

    /// Replaces the error envelope detection strategy.
    #[must_use]
    pub const fn with_error_detection(mut self, detection: ErrorDetection) -> Self {
        self.error_detection = detection;
        self
    }

    /// Checks values the type system cannot rule out.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FrameLimit`] when `max_frame_bytes` is zero or
    /// larger than a `{packet, 4}` length prefix can describe.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_bytes == 0 || self.max_frame_bytes > MAX_PACKET_LENGTH {
            return Err(ConfigError::FrameLimit {
                value: self.max_frame_bytes,
            });
        }
        Ok(())
    }
}

/// Semantic validation failures for a loaded configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The frame size limit is outside `1..=u32::MAX`.
    #[error("max_frame_bytes must be between 1 and 4294967295, got {value}")]
    FrameLimit {
        /// Rejected value.
        value: u64,
    },
}

#[cfg(test)]
mod tests;
