//! Outcome encoding and delivery to the host.
//!
//! Every processed command produces exactly one [`Outcome`], which the
//! [`ResponseWriter`] encodes as an external term, frames, and writes with a
//! single `write_all` call:
//!
//! | Outcome | Term |
//! |---|---|
//! | `Ok` | `ok` |
//! | `OkWithString(s)` | `{ok, <<s>>}` |
//! | `ErrorWithString(s)` | `{error, <<s>>}` |
//! | `UnknownCommand` | `{error, unknown_command}` |

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;

use crate::term::{Atom, Term, TermError};
use crate::wire::{WireError, encode_frame};

/// Result of executing one command, before wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Success without a payload.
    Ok,
    /// Success carrying a serialized result.
    OkWithString(String),
    /// Failure carrying the engine's message or error envelope.
    ErrorWithString(String),
    /// The command tag was not recognised.
    UnknownCommand,
}

impl Outcome {
    /// Builds the term sent to the host for this outcome.
    #[must_use]
    pub fn to_term(&self) -> Term<'_> {
        match self {
            Self::Ok => Term::Atom(Atom::OK),
            Self::OkWithString(payload) => Term::pair(Term::Atom(Atom::OK), Term::text(payload)),
            Self::ErrorWithString(message) => {
                Term::pair(Term::Atom(Atom::ERROR), Term::text(message))
            }
            Self::UnknownCommand => Term::pair(
                Term::Atom(Atom::ERROR),
                Term::Atom(Atom::UNKNOWN_COMMAND),
            ),
        }
    }

    /// Short label used in log records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::OkWithString(_) => "ok_with_string",
            Self::ErrorWithString(_) => "error_with_string",
            Self::UnknownCommand => "unknown_command",
        }
    }

    /// Whether the host will see an `ok` response.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok | Self::OkWithString(_))
    }
}

/// Errors raised while delivering a response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The outcome could not be represented as a term.
    #[error("failed to encode response term: {0}")]
    Encode(#[from] TermError),

    /// The encoded term does not fit a frame.
    #[error("failed to frame response: {0}")]
    Frame(#[from] WireError),

    /// Writing to the output channel failed.
    #[error("failed to write response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Encodes outcomes onto the output channel.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps the output channel.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encodes and writes one outcome as a single framed message.
    ///
    /// # Errors
    ///
    /// Returns a [`ResponseError`] if encoding fails or the channel rejects
    /// the write. Nothing is written when encoding fails.
    pub fn write_outcome(&mut self, outcome: &Outcome) -> Result<(), ResponseError> {
        let term = outcome.to_term().encode()?;
        let frame = encode_frame(&term)?;
        self.writer.write_all(&frame).map_err(write_error)?;
        self.writer.flush().map_err(write_error)
    }

    /// Returns the wrapped channel.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Borrows the wrapped channel.
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.writer
    }
}

fn write_error(source: std::io::Error) -> ResponseError {
    ResponseError::Write {
        source: Arc::new(source),
    }
}
