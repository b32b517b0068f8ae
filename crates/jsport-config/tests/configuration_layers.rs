//! Layering tests for `JsportConfig` loading.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use jsport_config::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, ErrorDetection, JsportConfig, LogFormat,
};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises access to the process environment for the duration of a test.
fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let previous = std::env::var_os(key);
        // Environment mutation is unsafe under edition 2024; callers hold the
        // env lock.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("jsport")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[test]
fn bare_invocation_uses_defaults() {
    let _guard = env_lock();
    let config = JsportConfig::load_from_iter(args(&[])).expect("load defaults");
    assert_eq!(config, JsportConfig::default());
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    assert_eq!(config.error_detection(), ErrorDetection::Substring);
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[test]
fn environment_overrides_defaults() {
    let _guard = env_lock();
    let _env = EnvOverride::set_var("JSPORT_ERROR_DETECTION", OsStr::new("structural"));
    let config = JsportConfig::load_from_iter(args(&[])).expect("load with env");
    assert_eq!(config.error_detection(), ErrorDetection::Structural);
}

#[test]
fn command_line_overrides_environment() {
    let _guard = env_lock();
    let _env = EnvOverride::set_var("JSPORT_MAX_FRAME_BYTES", OsStr::new("2048"));
    let config = JsportConfig::load_from_iter(args(&["--max-frame-bytes", "4096"]))
        .expect("load with cli");
    assert_eq!(config.max_frame_bytes(), 4096);
}

#[test]
fn configuration_file_supplies_values() {
    let _guard = env_lock();
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("jsport.toml");
    fs::write(
        &path,
        "memory_limit_bytes = 1048576\nlog_format = \"compact\"\n",
    )
    .expect("write config file");

    let config_path = path.to_string_lossy().into_owned();
    let config = JsportConfig::load_from_iter(args(&["--config-path", config_path.as_str()]))
        .expect("load with file");
    assert_eq!(config.memory_limit_bytes(), Some(1_048_576));
    assert_eq!(config.log_format(), LogFormat::Compact);
}
