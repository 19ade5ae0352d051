//! Stream framing for the legacy C1/C2 packet families.
//!
//! The codec accumulates raw transport bytes and splits them into complete
//! frames using the marker and declared-length header fields, which stay in
//! the clear for every supported cipher.

use crate::header::{C1_MARKER, C2_MARKER};

/// Shortest frame the gateway accepts: marker, length, code and one more
/// byte.
pub const MIN_FRAME_LEN: usize = 4;

/// Limits used by the framing codec to protect against malformed or abusive
/// input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecLimits {
    pub max_receive_size: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_receive_size: 1024,
        }
    }
}

/// Errors produced while splitting frames off the byte stream.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown packet marker {actual:#04X}")]
    InvalidMarker { actual: u8 },

    #[error("declared frame length {actual} below minimum {minimum}")]
    FrameTooShort { actual: usize, minimum: usize },

    #[error("declared frame length {actual} exceeds limit {limit}")]
    FrameTooLarge { actual: usize, limit: usize },
}

/// Splits complete frames off an accumulating receive buffer.
#[derive(Clone, Debug, Default)]
pub struct FrameCodec {
    limits: CodecLimits,
}

impl FrameCodec {
    #[must_use]
    pub const fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// Returns the total length of the frame at the front of `buffer`.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A malformed header is
    /// an error that must disconnect the owning connection.
    pub fn try_frame_len(&self, buffer: &[u8]) -> Result<Option<usize>, CodecError> {
        let Some(&marker) = buffer.first() else {
            return Ok(None);
        };

        let declared = match marker {
            C1_MARKER => match buffer.get(1) {
                Some(&len) => len as usize,
                None => return Ok(None),
            },
            C2_MARKER => {
                if buffer.len() < 3 {
                    return Ok(None);
                }
                u16::from_be_bytes([buffer[1], buffer[2]]) as usize
            }
            actual => return Err(CodecError::InvalidMarker { actual }),
        };

        if declared < MIN_FRAME_LEN {
            return Err(CodecError::FrameTooShort {
                actual: declared,
                minimum: MIN_FRAME_LEN,
            });
        }
        if declared > self.limits.max_receive_size {
            return Err(CodecError::FrameTooLarge {
                actual: declared,
                limit: self.limits.max_receive_size,
            });
        }

        if buffer.len() < declared {
            return Ok(None);
        }
        Ok(Some(declared))
    }
}
