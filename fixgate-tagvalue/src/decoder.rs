/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Tag=value parsing.
//!
//! [`Decoder`] walks a frame field by field, borrowing from the input.
//! [`decode_message`] checks the framing and returns an owned [`Message`].

use crate::checksum::{calculate_checksum, parse_checksum};
use crate::encoder::SOH;
use fixgate_core::error::DecodeError;
use fixgate_core::message::{Message, MsgType, tags};
use memchr::memchr;

/// One field, borrowed from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlice<'a> {
    pub tag: u32,
    pub value: &'a [u8],
}

impl<'a> FieldSlice<'a> {
    /// # Errors
    /// `DecodeError::InvalidUtf8` when the value is not UTF-8.
    pub fn as_str(&self) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.value).map_err(DecodeError::from)
    }
}

/// Cursor over a single frame.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    verify_checksum: bool,
}

impl<'a> Decoder<'a> {
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            verify_checksum: true,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.verify_checksum = validate;
        self
    }

    /// Reads the next field and requires it to carry `tag`.
    fn expect(
        &mut self,
        tag: u32,
        missing: DecodeError,
        wrong: DecodeError,
    ) -> Result<FieldSlice<'a>, DecodeError> {
        match self.next_field() {
            Some(field) if field.tag == tag => Ok(field),
            Some(_) => Err(wrong),
            None => Err(missing),
        }
    }

    /// Decodes the frame starting at the cursor.
    ///
    /// BodyLength must point exactly at the CheckSum field, and the checksum
    /// is verified unless turned off.
    ///
    /// # Errors
    /// Any `DecodeError` describing the first problem found.
    pub fn decode(&mut self) -> Result<Message, DecodeError> {
        let frame_start = self.pos;

        let begin_string = self
            .expect(
                tags::BEGIN_STRING,
                DecodeError::Incomplete,
                DecodeError::InvalidBeginString,
            )?
            .as_str()?;
        let body_len: usize = self
            .expect(
                tags::BODY_LENGTH,
                DecodeError::MissingBodyLength,
                DecodeError::MissingBodyLength,
            )?
            .as_str()?
            .parse()
            .map_err(|_| DecodeError::InvalidBodyLength)?;
        let body_start = self.pos;

        let msg_type: MsgType = self
            .expect(
                tags::MSG_TYPE,
                DecodeError::MissingMsgType,
                DecodeError::MissingMsgType,
            )?
            .as_str()?
            .parse()
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(16);
        let (declared, trailer_start) = loop {
            let field_start = self.pos;
            let field = self.next_field().ok_or(DecodeError::Incomplete)?;
            if field.tag == tags::CHECKSUM {
                break (field.value, field_start);
            }
            fields.push((field.tag, field.as_str()?.to_owned()));
        };

        if trailer_start - body_start != body_len {
            return Err(DecodeError::InvalidBodyLength);
        }

        if self.verify_checksum {
            let declared =
                parse_checksum(declared).ok_or_else(|| DecodeError::InvalidFieldValue {
                    tag: tags::CHECKSUM,
                    reason: "expected three digits".to_owned(),
                })?;
            let calculated = calculate_checksum(&self.input[frame_start..trailer_start]);
            if calculated != declared {
                return Err(DecodeError::ChecksumMismatch {
                    calculated,
                    declared,
                });
            }
        }

        Ok(Message::from_parts(begin_string, msg_type, fields))
    }

    /// Next complete `tag=value<SOH>` field, or `None` when the input ends
    /// or the field is truncated or has a non-numeric tag.
    #[inline]
    pub fn next_field(&mut self) -> Option<FieldSlice<'a>> {
        let rest = self.input.get(self.pos..).filter(|r| !r.is_empty())?;
        let eq = memchr(b'=', rest)?;
        let tag = parse_tag(&rest[..eq])?;
        let value_len = memchr(SOH, &rest[eq + 1..])?;

        self.pos += eq + 1 + value_len + 1;
        Some(FieldSlice {
            tag,
            value: &rest[eq + 1..eq + 1 + value_len],
        })
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Decodes one complete frame with checksum verification.
///
/// # Errors
/// See [`Decoder::decode`].
pub fn decode_message(frame: &[u8]) -> Result<Message, DecodeError> {
    Decoder::new(frame).decode()
}

#[inline]
fn parse_tag(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc.checked_mul(10)?.checked_add(u32::from(b - b'0')))
            .flatten()
    })
}
