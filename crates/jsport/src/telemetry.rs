//! Diagnostic logging for the port process.
//!
//! Standard output carries the port protocol, so every log record goes to
//! standard error. A node may run many port processes whose stderr is merged
//! by the host; records emitted inside [`port_span`] carry the OS process id
//! so they can be told apart.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{Span, Subscriber, info_span, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use jsport_config::{JsportConfig, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Marker returned once logging is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber on the first call; later calls are no-ops.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a different
/// subscriber already owns the global slot.
pub fn initialise(config: &JsportConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            let subscriber = build_subscriber(config, io::stderr, io::stderr().is_terminal())?;
            tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
        })
        .map(|()| TelemetryHandle)
}

/// Span wrapping everything one port process logs.
#[must_use]
pub fn port_span() -> Span {
    info_span!("port", pid = std::process::id())
}

fn build_subscriber<W>(
    config: &JsportConfig,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
