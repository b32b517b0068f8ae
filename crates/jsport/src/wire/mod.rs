//! Request decoding for the port protocol.
//!
//! A request buffer is a two byte command tag followed by the command's string
//! arguments. Each argument is a 4-byte big-endian length and that many bytes
//! of UTF-8:
//!
//! ```text
//! "ej" <len:u32> filename <len:u32> code
//! "dj" <len:u32> filename <len:u32> code
//! "sd"
//! ```
//!
//! Decoding borrows from the request buffer, so the arguments are released
//! when the buffer is, on every path through dispatch. Structural problems
//! (a buffer shorter than its declared fields, non-UTF-8 text) are reported as
//! [`WireError`]; the port treats them as fatal protocol violations. Bytes after
//! the last expected argument are ignored.

mod frame;

use std::str::Utf8Error;
use std::sync::Arc;

use thiserror::Error;

pub use self::frame::{FrameReader, PACKET_HEADER_LEN, encode_frame};

/// Length of the command tag at the start of every request.
pub const TAG_LEN: usize = 2;

const LENGTH_PREFIX_LEN: usize = 4;

/// Errors raised while decoding request frames and buffers.
#[derive(Debug, Error)]
pub enum WireError {
    /// The buffer ended before a declared field was complete.
    #[error("request truncated while reading {field}: needed {needed} bytes, {available} left")]
    Truncated {
        /// Field being decoded.
        field: &'static str,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },

    /// A string argument was not valid UTF-8.
    #[error("request field {field} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        /// Field being decoded.
        field: &'static str,
        /// Underlying decoding error.
        #[source]
        source: Utf8Error,
    },

    /// The input closed part-way through a frame.
    #[error("input closed inside a frame: expected {expected} bytes, received {received}")]
    TruncatedFrame {
        /// Bytes the frame header or body required.
        expected: usize,
        /// Bytes received before end of input.
        received: usize,
    },

    /// A frame declared a length above the configured limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Declared frame length.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// Reading from the input channel failed.
    #[error("failed to read request frame: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Recognised command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    /// `ej`: evaluate and return the JSON-serialized result.
    EvalJson,
    /// `dj`: evaluate and discard the result.
    EvalDiscard,
    /// `sd`: request process-wide engine teardown at detach.
    Shutdown,
    /// Any other two bytes.
    Unknown([u8; TAG_LEN]),
}

impl CommandTag {
    /// Classifies a raw tag.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        match &bytes {
            b"ej" => Self::EvalJson,
            b"dj" => Self::EvalDiscard,
            b"sd" => Self::Shutdown,
            _ => Self::Unknown(bytes),
        }
    }

    /// Returns the raw tag bytes.
    #[must_use]
    pub const fn as_bytes(self) -> [u8; TAG_LEN] {
        match self {
            Self::EvalJson => *b"ej",
            Self::EvalDiscard => *b"dj",
            Self::Shutdown => *b"sd",
            Self::Unknown(bytes) => bytes,
        }
    }
}

impl std::fmt::Display for CommandTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_bytes()
            .iter()
            .try_for_each(|byte| write!(f, "{}", byte.escape_ascii()))
    }
}

/// A decoded request. String arguments borrow from the request buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Evaluate `code` and return its JSON serialization.
    EvalJson {
        /// Name used to attribute diagnostics.
        filename: &'a str,
        /// Script source.
        code: &'a str,
    },
    /// Evaluate `code` for its side effects.
    EvalDiscard {
        /// Name used to attribute diagnostics.
        filename: &'a str,
        /// Script source.
        code: &'a str,
    },
    /// Mark the instance for process-wide teardown.
    Shutdown,
    /// An unrecognised tag.
    Unknown {
        /// The raw tag bytes.
        tag: [u8; TAG_LEN],
    },
}

impl<'a> Command<'a> {
    /// Decodes a complete request buffer.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] when the buffer is shorter than the
    /// tag or a declared argument, and [`WireError::InvalidUtf8`] when an
    /// argument is not UTF-8.
    pub fn decode(buffer: &'a [u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(buffer);
        let command = match cursor.read_tag()? {
            CommandTag::EvalJson => {
                let (filename, code) = read_script_arguments(&mut cursor)?;
                Self::EvalJson { filename, code }
            }
            CommandTag::EvalDiscard => {
                let (filename, code) = read_script_arguments(&mut cursor)?;
                Self::EvalDiscard { filename, code }
            }
            CommandTag::Shutdown => Self::Shutdown,
            CommandTag::Unknown(tag) => Self::Unknown { tag },
        };
        Ok(command)
    }

    /// Returns the tag this command was decoded from.
    #[must_use]
    pub const fn tag(&self) -> CommandTag {
        match self {
            Self::EvalJson { .. } => CommandTag::EvalJson,
            Self::EvalDiscard { .. } => CommandTag::EvalDiscard,
            Self::Shutdown => CommandTag::Shutdown,
            Self::Unknown { tag } => CommandTag::Unknown(*tag),
        }
    }
}

fn read_script_arguments<'a>(cursor: &mut Cursor<'a>) -> Result<(&'a str, &'a str), WireError> {
    let filename = cursor.read_string("filename")?;
    let code = cursor.read_string("code")?;
    Ok((filename, code))
}

/// Forward-only reader over a request buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    remaining: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Starts reading at the beginning of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            remaining: buffer,
            position: 0,
        }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> &'a [u8] {
        self.remaining
    }

    /// Consumes the two byte command tag.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] if fewer than two bytes remain.
    pub fn read_tag(&mut self) -> Result<CommandTag, WireError> {
        let tag = self.take_array::<TAG_LEN>("command tag")?;
        Ok(CommandTag::from_bytes(tag))
    }

    /// Consumes one length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] if the prefix or the body is
    /// incomplete, or [`WireError::InvalidUtf8`] if the body is not UTF-8.
    #[expect(
        clippy::big_endian_bytes,
        reason = "argument length prefixes are big-endian on the wire"
    )]
    pub fn read_string(&mut self, field: &'static str) -> Result<&'a str, WireError> {
        let prefix = self.take_array::<LENGTH_PREFIX_LEN>(field)?;
        let declared = u32::from_be_bytes(prefix);
        let len = usize::try_from(declared).map_err(|_| WireError::Truncated {
            field,
            needed: usize::MAX,
            available: self.remaining.len(),
        })?;
        let bytes = self.take(field, len)?;
        std::str::from_utf8(bytes).map_err(|source| WireError::InvalidUtf8 { field, source })
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], WireError> {
        let Some((head, tail)) = self.remaining.split_at_checked(len) else {
            return Err(WireError::Truncated {
                field,
                needed: len,
                available: self.remaining.len(),
            });
        };
        self.remaining = tail;
        self.position += len;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], WireError> {
        let Some((head, tail)) = self.remaining.split_first_chunk::<N>() else {
            return Err(WireError::Truncated {
                field,
                needed: N,
                available: self.remaining.len(),
            });
        };
        self.remaining = tail;
        self.position += N;
        Ok(*head)
    }
}
