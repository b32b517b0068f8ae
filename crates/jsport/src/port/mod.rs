//! The port process loop.
//!
//! The host spawns `jsport` with `{packet, 4}` framing. Process start is the
//! attach; end of standard input is the detach. Each frame is one request and
//! receives exactly one framed response on standard output.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::{error, info};

use jsport_config::{ConfigError, JsportConfig};

use crate::bridge::{Bridge, BridgeError, BridgeOptions};
use crate::engine::EngineService;
use crate::lifecycle::StopReport;
use crate::telemetry::TelemetryError;
use crate::wire::{FrameReader, WireError};

const PORT_TARGET: &str = "jsport::port";

/// Errors that end the port process.
#[derive(Debug, Error)]
pub enum PortError {
    /// Configuration layers could not be merged.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),

    /// The merged configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The input channel delivered a malformed frame.
    #[error("protocol violation: {0}")]
    Input(#[source] WireError),

    /// The instance failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Source of the process configuration.
pub trait ConfigLoader {
    /// Loads configuration from `args` and the ambient layers.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::LoadConfiguration`] when a layer is malformed.
    fn load(&self, args: &[OsString]) -> Result<JsportConfig, PortError>;
}

/// Loader that merges defaults, file, environment and `args` with
/// `ortho_config`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<JsportConfig, PortError> {
        JsportConfig::load_from_iter(args.iter().cloned()).map_err(PortError::LoadConfiguration)
    }
}

/// Loads and validates configuration.
///
/// # Errors
///
/// Returns [`PortError`] when loading fails or the values are unusable.
pub fn load_config<L>(args: &[OsString], loader: &L) -> Result<JsportConfig, PortError>
where
    L: ConfigLoader + ?Sized,
{
    let config = loader.load(args)?;
    config.validate()?;
    Ok(config)
}

/// Converts the configured frame limit to an in-memory size.
#[must_use]
pub fn frame_limit(config: &JsportConfig) -> usize {
    usize::try_from(config.max_frame_bytes()).unwrap_or(usize::MAX)
}

/// Serves one extension instance until `input` reaches end of file.
///
/// The instance is always detached before returning, so the engine is stopped
/// and any requested process-wide teardown runs even when the loop fails.
///
/// # Errors
///
/// Returns [`PortError`] when the engine cannot start, a frame or request is
/// malformed, or a response cannot be written.
pub fn run_with<S, R, W>(
    service: S,
    input: R,
    output: W,
    options: BridgeOptions,
    max_frame_bytes: usize,
) -> Result<StopReport, PortError>
where
    S: EngineService,
    R: Read,
    W: Write,
{
    let mut bridge = Bridge::attach(service, output, options)?;
    info!(target: PORT_TARGET, max_frame_bytes, "attached");

    let mut frames = FrameReader::new(input, max_frame_bytes);
    let mut served: u64 = 0;
    let result = loop {
        match frames.next_frame() {
            Ok(Some(frame)) => {
                if let Err(failure) = bridge.process(frame) {
                    break Err(PortError::from(failure));
                }
                served += 1;
            }
            Ok(None) => break Ok(()),
            Err(failure) => break Err(PortError::Input(failure)),
        }
    };

    if let Err(failure) = &result {
        error!(target: PORT_TARGET, error = %failure, served, "port loop failed");
    }
    let report = bridge.detach();
    info!(
        target: PORT_TARGET,
        served,
        handle_released = report.handle_released,
        teardown = ?report.teardown,
        "detached"
    );
    result.map(|()| report)
}

/// Runs the port over standard input and output with the QuickJS engine.
///
/// # Errors
///
/// Returns [`PortError`] for configuration, logging or protocol failures.
#[cfg(feature = "quickjs")]
pub fn run<L>(args: &[OsString], loader: &L) -> Result<StopReport, PortError>
where
    L: ConfigLoader + ?Sized,
{
    use std::io::{self, BufReader, BufWriter};

    use crate::engine::quickjs::QuickJsService;

    let config = load_config(args, loader)?;
    crate::telemetry::initialise(&config)?;
    let _port = crate::telemetry::port_span().entered();

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with(
        QuickJsService::from_config(&config),
        BufReader::new(stdin.lock()),
        BufWriter::new(stdout.lock()),
        BridgeOptions::from_config(&config),
        frame_limit(&config),
    )
}
