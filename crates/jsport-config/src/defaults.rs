use crate::choices::{ErrorDetection, LogFormat};

/// Default log filter expression used by the bridge.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default upper bound for a single request frame (64 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 64 * 1024 * 1024;

/// Default log filter expression used by the bridge.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default request frame limit.
#[must_use]
pub const fn default_max_frame_bytes() -> u64 {
    DEFAULT_MAX_FRAME_BYTES
}

/// Default error envelope detection.
#[must_use]
pub const fn default_error_detection() -> ErrorDetection {
    ErrorDetection::Substring
}
