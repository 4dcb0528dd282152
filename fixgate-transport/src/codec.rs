/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Framing of FIX messages on a socket byte stream.
//!
//! A frame is `8=...<SOH>9=<len><SOH>` followed by `len` body bytes and a
//! `10=NNN<SOH>` trailer. The codec hands out whole frames and leaves field
//! parsing to the session. In-process pipes carry whole frames already and
//! never go through it.

use bytes::{BufMut, Bytes, BytesMut};
use fixgate_tagvalue::checksum::{CHECKSUM_DIGITS, calculate_checksum, parse_checksum};
use memchr::memchr;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

const SOH: u8 = 0x01;

/// `10=` + digits + SOH.
const TRAILER_LEN: usize = 3 + CHECKSUM_DIGITS + 1;

/// Default upper bound on a single frame.
pub const DEFAULT_MAX_FRAME: usize = 1 << 20;

/// Reasons a byte stream cannot be framed. All of them end the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame does not start with 8=")]
    InvalidBeginString,

    #[error("BodyLength (9) must follow BeginString")]
    MissingBodyLength,

    #[error("BodyLength (9) is not a number")]
    InvalidBodyLength,

    /// BodyLength pointed somewhere other than a `10=NNN` trailer.
    #[error("frame trailer is malformed")]
    BadTrailer,

    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch { calculated: u8, declared: u8 },

    #[error("frame of {size} bytes exceeds the {max_size} byte limit")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Tokio codec producing one `BytesMut` per FIX frame.
#[derive(Debug, Clone)]
pub struct FixCodec {
    max_frame: usize,
    verify_checksum: bool,
}

impl FixCodec {
    /// Creates a codec that verifies checksums and caps frames at
    /// [`DEFAULT_MAX_FRAME`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
            verify_checksum: true,
        }
    }

    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_frame = size;
        self
    }

    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.verify_checksum = validate;
        self
    }

    fn check_size(&self, size: usize) -> Result<(), CodecError> {
        if size > self.max_frame {
            return Err(CodecError::MessageTooLarge {
                size,
                max_size: self.max_frame,
            });
        }
        Ok(())
    }
}

impl Default for FixCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the total frame length once the header is buffered.
fn frame_length(src: &[u8]) -> Result<Option<usize>, CodecError> {
    if src.len() >= 2 && !src.starts_with(b"8=") {
        return Err(CodecError::InvalidBeginString);
    }
    let Some(begin_end) = memchr(SOH, src) else {
        return Ok(None);
    };

    let rest = &src[begin_end + 1..];
    if rest.len() < 2 {
        return Ok(None);
    }
    if !rest.starts_with(b"9=") {
        return Err(CodecError::MissingBodyLength);
    }
    let Some(digits_end) = memchr(SOH, rest) else {
        return Ok(None);
    };
    let body_len: usize = std::str::from_utf8(&rest[2..digits_end])
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or(CodecError::InvalidBodyLength)?;

    let body_start = begin_end + 1 + digits_end + 1;
    Ok(Some(body_start + body_len + TRAILER_LEN))
}

impl Decoder for FixCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = frame_length(src)? else {
            return Ok(None);
        };
        self.check_size(len)?;
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let trailer = &src[len - TRAILER_LEN..len];
        if !trailer.starts_with(b"10=") || trailer[TRAILER_LEN - 1] != SOH {
            return Err(CodecError::BadTrailer);
        }
        if self.verify_checksum {
            let declared = parse_checksum(&trailer[3..3 + CHECKSUM_DIGITS])
                .ok_or(CodecError::BadTrailer)?;
            let calculated = calculate_checksum(&src[..len - TRAILER_LEN]);
            if declared != calculated {
                return Err(CodecError::ChecksumMismatch {
                    calculated,
                    declared,
                });
            }
        }
        Ok(Some(src.split_to(len)))
    }
}

impl Encoder<Bytes> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.check_size(frame.len())?;
        dst.put(frame);
        Ok(())
    }
}

impl Encoder<BytesMut> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(frame.freeze(), dst)
    }
}
