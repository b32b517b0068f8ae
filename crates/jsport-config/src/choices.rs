//! Enumerated settings accepted from files, environment and flags.
//!
//! Every choice is spelt in `snake_case` in all three layers and parses
//! case-insensitively from text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the diagnostic records the port writes to standard error.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per line; the host's log collector reads
    /// port stderr verbatim.
    #[default]
    Json,
    /// One terse text line per record, for running the port by hand.
    Compact,
}

/// How a serialized evaluation result is recognised as an engine error.
///
/// `Substring` reproduces the historical driver behaviour: any result that
/// contains the literal `{"error"` is reported as `{error, Binary}`, even when
/// the text only occurs inside a string value. `Structural` parses the result
/// and requires a top-level object with an `"error"` key. The structural check
/// changes observable behaviour, so it must be selected explicitly.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ErrorDetection {
    /// Literal substring match on `{"error"`.
    #[default]
    Substring,
    /// Top-level `"error"` key of a parsed JSON object.
    Structural,
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;

/// Error returned when text names no [`ErrorDetection`].
pub type ErrorDetectionParseError = strum::ParseError;
