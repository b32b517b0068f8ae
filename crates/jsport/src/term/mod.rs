//! Minimal External Term Format encoder.
//!
//! Only the shapes the bridge answers with are supported: atoms, binaries and
//! small tuples. Output is what `erlang:term_to_binary/1` produces on OTP 26
//! and later, so the host decodes it with `binary_to_term/1`.

use thiserror::Error;

/// Leading byte of every encoded term.
pub const VERSION_MAGIC: u8 = 131;

const SMALL_TUPLE_EXT: u8 = 104;
const BINARY_EXT: u8 = 109;
const SMALL_ATOM_UTF8_EXT: u8 = 119;

/// An atom known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(&'static str);

impl Atom {
    /// `ok`
    pub const OK: Self = Self("ok");
    /// `error`
    pub const ERROR: Self = Self("error");
    /// `unknown_command`
    pub const UNKNOWN_COMMAND: Self = Self("unknown_command");

    /// Creates an atom from its text.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the atom text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

/// A term borrowed from the outcome it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term<'a> {
    /// An atom.
    Atom(Atom),
    /// A binary holding the given bytes.
    Binary(&'a [u8]),
    /// A tuple of up to 255 elements.
    Tuple(Vec<Term<'a>>),
}

/// Reasons a term cannot be represented by the supported tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TermError {
    /// Atom text exceeds the 255 byte small atom limit.
    #[error("atom of {len} bytes exceeds the small atom limit")]
    AtomTooLong {
        /// Atom length in bytes.
        len: usize,
    },
    /// Binary exceeds the 32-bit length field.
    #[error("binary of {len} bytes exceeds the 32-bit length field")]
    BinaryTooLarge {
        /// Binary length in bytes.
        len: usize,
    },
    /// Tuple exceeds the small tuple arity limit.
    #[error("tuple of arity {arity} exceeds the small tuple limit")]
    TupleTooLarge {
        /// Number of elements.
        arity: usize,
    },
}

impl<'a> Term<'a> {
    /// Builds `{First, Second}`.
    #[must_use]
    pub fn pair(first: Self, second: Self) -> Self {
        Self::Tuple(vec![first, second])
    }

    /// Builds a binary term over UTF-8 text.
    #[must_use]
    pub const fn text(text: &'a str) -> Self {
        Self::Binary(text.as_bytes())
    }

    /// Encodes the term, including the version byte.
    ///
    /// # Errors
    ///
    /// Returns a [`TermError`] when a component exceeds its length field.
    pub fn encode(&self) -> Result<Vec<u8>, TermError> {
        let mut buffer = Vec::with_capacity(self.encoded_len_hint());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Appends the version byte and the encoded term to `buffer`.
    ///
    /// On error `buffer` may hold a partial encoding and should be discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`TermError`] when a component exceeds its length field.
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), TermError> {
        buffer.push(VERSION_MAGIC);
        self.encode_body(buffer)
    }

    #[expect(
        clippy::big_endian_bytes,
        reason = "external term format lengths are big-endian"
    )]
    fn encode_body(&self, buffer: &mut Vec<u8>) -> Result<(), TermError> {
        match self {
            Self::Atom(atom) => {
                let name = atom.name().as_bytes();
                let len = u8::try_from(name.len())
                    .map_err(|_| TermError::AtomTooLong { len: name.len() })?;
                buffer.push(SMALL_ATOM_UTF8_EXT);
                buffer.push(len);
                buffer.extend_from_slice(name);
            }
            Self::Binary(bytes) => {
                let len = u32::try_from(bytes.len())
                    .map_err(|_| TermError::BinaryTooLarge { len: bytes.len() })?;
                buffer.push(BINARY_EXT);
                buffer.extend_from_slice(&len.to_be_bytes());
                buffer.extend_from_slice(bytes);
            }
            Self::Tuple(elements) => {
                let arity = u8::try_from(elements.len()).map_err(|_| TermError::TupleTooLarge {
                    arity: elements.len(),
                })?;
                buffer.push(SMALL_TUPLE_EXT);
                buffer.push(arity);
                for element in elements {
                    element.encode_body(buffer)?;
                }
            }
        }
        Ok(())
    }

    fn encoded_len_hint(&self) -> usize {
        match self {
            Self::Atom(atom) => 2 + atom.name().len(),
            Self::Binary(bytes) => 5 + bytes.len(),
            Self::Tuple(elements) => 2 + elements.iter().map(Self::encoded_len_hint).sum::<usize>(),
        }
        .saturating_add(1)
    }
}
