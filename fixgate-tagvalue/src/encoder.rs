/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Tag=value serialization.
//!
//! [`Encoder`] collects body fields and wraps them in the standard header
//! and trailer when finished. [`encode_message`] does the same for a whole
//! [`Message`].

use crate::checksum::{calculate_checksum, format_checksum};
use bytes::{BufMut, BytesMut};
use fixgate_core::error::EncodeError;
use fixgate_core::message::{Message, tags};

/// Field delimiter.
pub const SOH: u8 = 0x01;

/// Room for `8=`, `9=`, `10=` and their delimiters on top of the values.
const FRAMING_OVERHEAD: usize = 24;

fn push_field(buf: &mut BytesMut, tag: u32, value: &[u8]) {
    buf.put_slice(itoa::Buffer::new().format(tag).as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value);
    buf.put_u8(SOH);
}

/// Builds one outbound frame.
///
/// BeginString (8), BodyLength (9) and CheckSum (10) are written by
/// [`Encoder::finish`]; callers only append body fields.
#[derive(Debug)]
pub struct Encoder {
    begin_string: String,
    body: BytesMut,
}

impl Encoder {
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            begin_string: begin_string.into(),
            body: BytesMut::with_capacity(256),
        }
    }

    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        push_field(&mut self.body, tag, value.as_bytes());
    }

    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        push_field(&mut self.body, tag, itoa::Buffer::new().format(value).as_bytes());
    }

    /// Writes `Y` or `N`.
    #[inline]
    pub fn put_bool(&mut self, tag: u32, value: bool) {
        push_field(&mut self.body, tag, if value { b"Y" } else { b"N" });
    }

    /// Writes `value` as is. The caller guarantees it holds no SOH.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        push_field(&mut self.body, tag, value);
    }

    /// Bytes appended so far; this is what BodyLength will carry.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Wraps the body in header and trailer.
    #[must_use]
    pub fn finish(self) -> BytesMut {
        let Self { begin_string, body } = self;
        let mut frame =
            BytesMut::with_capacity(begin_string.len() + body.len() + FRAMING_OVERHEAD);

        push_field(&mut frame, tags::BEGIN_STRING, begin_string.as_bytes());
        push_field(
            &mut frame,
            tags::BODY_LENGTH,
            itoa::Buffer::new().format(body.len()).as_bytes(),
        );
        frame.put_slice(&body);

        let checksum = format_checksum(calculate_checksum(&frame));
        push_field(&mut frame, tags::CHECKSUM, &checksum);
        frame
    }
}

/// Serializes `message` under `begin_string`.
///
/// MsgType leads, then the header fields in their standard order, then the
/// body in the order it was built.
///
/// # Errors
/// [`EncodeError::EmbeddedDelimiter`] when a value contains SOH.
pub fn encode_message(begin_string: &str, message: &Message) -> Result<BytesMut, EncodeError> {
    let mut encoder = Encoder::new(begin_string);
    encoder.put_str(tags::MSG_TYPE, message.msg_type().as_str());
    for (tag, value) in message.wire_fields() {
        if memchr::memchr(SOH, value.as_bytes()).is_some() {
            return Err(EncodeError::EmbeddedDelimiter { tag });
        }
        encoder.put_str(tag, value);
    }
    Ok(encoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::parse_checksum;
    use fixgate_core::message::MsgType;

    #[test]
    fn test_finish_frames_the_body() {
        let mut encoder = Encoder::new("FIX.4.4");
        encoder.put_str(35, "0");
        assert_eq!(encoder.body_len(), 5);

        let frame = encoder.finish();
        assert!(frame.starts_with(b"8=FIX.4.4\x019=5\x0135=0\x0110="));
        assert_eq!(frame.len(), b"8=FIX.4.4\x019=5\x0135=0\x01".len() + 7);

        let trailer_at = frame.len() - 7;
        let declared = parse_checksum(&frame[trailer_at + 3..trailer_at + 6]);
        assert_eq!(declared, Some(calculate_checksum(&frame[..trailer_at])));
    }

    #[test]
    fn test_typed_puts() {
        let mut encoder = Encoder::new("FIX.4.4");
        encoder.put_uint(34, 12);
        encoder.put_bool(141, true);
        encoder.put_bool(43, false);
        encoder.put_raw(58, b"hi");

        let frame = encoder.finish();
        let text = String::from_utf8_lossy(&frame);
        assert!(text.contains("\x0134=12\x01141=Y\x0143=N\x0158=hi\x01"));
    }

    #[test]
    fn test_encode_message_header_order() {
        let msg = Message::new(MsgType::Email)
            .with_field(tags::SUBJECT, "Test")
            .with_field(tags::MSG_SEQ_NUM, "2")
            .with_field(tags::SENDER_COMP_ID, "TRADER")
            .with_field(tags::TARGET_COMP_ID, "MARKET");

        let bytes = encode_message("FIX.4.2", &msg).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let body_start = text.find("35=").unwrap();

        assert!(
            text[body_start..]
                .starts_with("35=C\x0149=TRADER\x0156=MARKET\x0134=2\x01147=Test\x01")
        );
    }

    #[test]
    fn test_encode_message_rejects_soh() {
        let msg = Message::new(MsgType::News).with_field(tags::TEXT, "bad\x01value");
        assert_eq!(
            encode_message("FIX.4.2", &msg),
            Err(EncodeError::EmbeddedDelimiter { tag: tags::TEXT })
        );
    }
}
