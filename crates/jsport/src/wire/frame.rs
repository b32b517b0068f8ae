//! `{packet, 4}` framing for the port channel.

use std::io::{self, Read};
use std::sync::Arc;

use super::WireError;

/// Length of the big-endian size header on every frame.
pub const PACKET_HEADER_LEN: usize = 4;

/// Reads length-prefixed frames, reusing one buffer between frames.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
    buffer: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `reader`, rejecting frames longer than `max_frame_bytes`.
    #[must_use]
    pub const fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
            buffer: Vec::new(),
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the input closes cleanly between frames, which
    /// is how the host detaches.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if input ends inside a frame,
    /// [`WireError::FrameTooLarge`] if the declared length exceeds the limit,
    /// and [`WireError::Io`] for read failures.
    #[expect(
        clippy::big_endian_bytes,
        reason = "packet headers are big-endian on the wire"
    )]
    pub fn next_frame(&mut self) -> Result<Option<&[u8]>, WireError> {
        let mut header = [0_u8; PACKET_HEADER_LEN];
        let received = read_fully(&mut self.reader, &mut header)?;
        if received == 0 {
            return Ok(None);
        }
        if received < PACKET_HEADER_LEN {
            return Err(WireError::TruncatedFrame {
                expected: PACKET_HEADER_LEN,
                received,
            });
        }

        let declared = u32::from_be_bytes(header);
        let len = usize::try_from(declared).unwrap_or(usize::MAX);
        if len > self.max_frame_bytes {
            return Err(WireError::FrameTooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }

        self.buffer.clear();
        self.buffer.resize(len, 0);
        let received = read_fully(&mut self.reader, &mut self.buffer)?;
        if received < len {
            return Err(WireError::TruncatedFrame {
                expected: len,
                received,
            });
        }
        Ok(Some(self.buffer.as_slice()))
    }
}

/// Prefixes `payload` with its `{packet, 4}` length header.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] when the payload length does not fit
/// the header.
#[expect(
    clippy::big_endian_bytes,
    reason = "packet headers are big-endian on the wire"
)]
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        len: payload.len(),
        max: usize::try_from(u32::MAX).unwrap_or(usize::MAX),
    })?;
    let mut frame = Vec::with_capacity(PACKET_HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Fills `buffer` unless input ends first; returns the bytes read.
fn read_fully(reader: &mut impl Read, buffer: &mut [u8]) -> Result<usize, WireError> {
    let mut filled = 0;
    while let Some(rest) = buffer.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match reader.read(rest) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                return Err(WireError::Io {
                    source: Arc::new(error),
                });
            }
        }
    }
    Ok(filled)
}
