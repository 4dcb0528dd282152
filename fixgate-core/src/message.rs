/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Message types for FIX protocol.
//!
//! This module provides:
//! - [`MsgType`]: Enumeration of FIX message types
//! - [`Message`]: Owned, ordered tag/value message passed through sessions,
//!   stores, logs and event listeners
//! - [`tags`]: Well-known tag numbers used by the session runtime

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known FIX tag numbers.
pub mod tags {
    /// BeginSeqNo (7).
    pub const BEGIN_SEQ_NO: u32 = 7;
    /// BeginString (8).
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength (9).
    pub const BODY_LENGTH: u32 = 9;
    /// CheckSum (10).
    pub const CHECKSUM: u32 = 10;
    /// EndSeqNo (16).
    pub const END_SEQ_NO: u32 = 16;
    /// MsgSeqNum (34).
    pub const MSG_SEQ_NUM: u32 = 34;
    /// MsgType (35).
    pub const MSG_TYPE: u32 = 35;
    /// NewSeqNo (36).
    pub const NEW_SEQ_NO: u32 = 36;
    /// PossDupFlag (43).
    pub const POSS_DUP_FLAG: u32 = 43;
    /// SenderCompID (49).
    pub const SENDER_COMP_ID: u32 = 49;
    /// SenderSubID (50).
    pub const SENDER_SUB_ID: u32 = 50;
    /// SendingTime (52).
    pub const SENDING_TIME: u32 = 52;
    /// TargetCompID (56).
    pub const TARGET_COMP_ID: u32 = 56;
    /// TargetSubID (57).
    pub const TARGET_SUB_ID: u32 = 57;
    /// Text (58).
    pub const TEXT: u32 = 58;
    /// EncryptMethod (98).
    pub const ENCRYPT_METHOD: u32 = 98;
    /// GapFillFlag (123).
    pub const GAP_FILL_FLAG: u32 = 123;
    /// HeartBtInt (108).
    pub const HEART_BT_INT: u32 = 108;
    /// TestReqID (112).
    pub const TEST_REQ_ID: u32 = 112;
    /// ResetSeqNumFlag (141).
    pub const RESET_SEQ_NUM_FLAG: u32 = 141;
    /// EmailThreadID (164).
    pub const EMAIL_THREAD_ID: u32 = 164;
    /// EmailType (94).
    pub const EMAIL_TYPE: u32 = 94;
    /// Subject (147).
    pub const SUBJECT: u32 = 147;
    /// Headline (148).
    pub const HEADLINE: u32 = 148;
}

/// Header tags in the order they are written after BeginString and BodyLength.
const HEADER_ORDER: [u32; 7] = [
    tags::MSG_TYPE,
    tags::SENDER_COMP_ID,
    tags::SENDER_SUB_ID,
    tags::TARGET_COMP_ID,
    tags::TARGET_SUB_ID,
    tags::MSG_SEQ_NUM,
    tags::SENDING_TIME,
];

/// FIX message types.
///
/// The session-level messages are listed explicitly together with the
/// application messages the adapter itself creates. Anything else is kept
/// verbatim as `Custom(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0) - Session level.
    #[default]
    Heartbeat,
    /// Test Request (1) - Session level.
    TestRequest,
    /// Resend Request (2) - Session level.
    ResendRequest,
    /// Reject (3) - Session level.
    Reject,
    /// Sequence Reset (4) - Session level.
    SequenceReset,
    /// Logout (5) - Session level.
    Logout,
    /// Execution Report (8).
    ExecutionReport,
    /// Logon (A) - Session level.
    Logon,
    /// News (B).
    News,
    /// Email (C).
    Email,
    /// New Order Single (D).
    NewOrderSingle,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Custom or unknown message type.
    Custom(String),
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "8" => Self::ExecutionReport,
            "A" => Self::Logon,
            "B" => Self::News,
            "C" => Self::Email,
            "D" => Self::NewOrderSingle,
            "j" => Self::BusinessMessageReject,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::ExecutionReport => "8",
            Self::Logon => "A",
            Self::News => "B",
            Self::Email => "C",
            Self::NewOrderSingle => "D",
            Self::BusinessMessageReject => "j",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns true if this is an administrative message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true if this is an application message.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owned FIX message.
///
/// Fields are kept in insertion order, except that header fields are moved
/// to the front (in standard header order) when the message is encoded.
/// BeginString, BodyLength and CheckSum are never stored as fields; the
/// BeginString of a decoded message is available from [`Message::begin_string`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// BeginString the message was received with, if decoded from the wire.
    begin_string: Option<String>,
    /// The message type.
    msg_type: MsgType,
    /// Ordered (tag, value) pairs, excluding 8, 9, 10 and 35.
    fields: Vec<(u32, String)>,
}

impl Message {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(msg_type: MsgType) -> Self {
        Self {
            begin_string: None,
            msg_type,
            fields: Vec::new(),
        }
    }

    /// Builds a message from decoded parts.
    ///
    /// Tags 8, 9, 10 and 35 in `fields` are ignored.
    #[must_use]
    pub fn from_parts(
        begin_string: impl Into<String>,
        msg_type: MsgType,
        fields: impl IntoIterator<Item = (u32, String)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .filter(|(tag, _)| !is_framing_tag(*tag))
            .collect();
        Self {
            begin_string: Some(begin_string.into()),
            msg_type,
            fields,
        }
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns the BeginString this message was decoded with.
    #[must_use]
    pub fn begin_string(&self) -> Option<&str> {
        self.begin_string.as_deref()
    }

    /// Returns true if this is an administrative message.
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.msg_type.is_admin()
    }

    /// Sets a field, replacing the first existing value for the tag.
    ///
    /// Setting tag 35 changes the message type.
    pub fn set_field(&mut self, tag: u32, value: impl Into<String>) {
        let value = value.into();
        if tag == tags::MSG_TYPE {
            self.msg_type = value.parse().unwrap_or_default();
            return;
        }
        if is_framing_tag(tag) {
            return;
        }
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Builder-style variant of [`Message::set_field`].
    #[must_use]
    pub fn with_field(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.set_field(tag, value);
        self
    }

    /// Removes a field, returning its value.
    pub fn remove_field(&mut self, tag: u32) -> Option<String> {
        let pos = self.fields.iter().position(|(t, _)| *t == tag)?;
        Some(self.fields.remove(pos).1)
    }

    /// Gets a field value by tag.
    ///
    /// Tag 35 returns the message type.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<&str> {
        if tag == tags::MSG_TYPE {
            return Some(self.msg_type.as_str());
        }
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the message carries the tag.
    #[must_use]
    pub fn has_field(&self, tag: u32) -> bool {
        self.get_field(tag).is_some()
    }

    /// Gets a field value parsed as the specified type.
    #[must_use]
    pub fn get_field_as<T: std::str::FromStr>(&self, tag: u32) -> Option<T> {
        self.get_field(tag).and_then(|v| v.parse().ok())
    }

    /// Returns the number of fields, excluding the message type.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the fields in wire order: standard header fields first,
    /// then the remaining fields in insertion order. The message type is
    /// not included.
    pub fn wire_fields(&self) -> impl Iterator<Item = (u32, &str)> {
        let header = HEADER_ORDER[1..].iter().filter_map(move |tag| {
            self.fields
                .iter()
                .find(|(t, _)| t == tag)
                .map(|(t, v)| (*t, v.as_str()))
        });
        let body = self
            .fields
            .iter()
            .filter(|(t, _)| !HEADER_ORDER.contains(t))
            .map(|(t, v)| (*t, v.as_str()));
        header.chain(body)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "35={}", self.msg_type)?;
        for (tag, value) in self.wire_fields() {
            write!(f, "|{tag}={value}")?;
        }
        Ok(())
    }
}

#[inline]
fn is_framing_tag(tag: u32) -> bool {
    matches!(
        tag,
        tags::BEGIN_STRING | tags::BODY_LENGTH | tags::CHECKSUM | tags::MSG_TYPE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_from_str() {
        assert_eq!("0".parse::<MsgType>().unwrap(), MsgType::Heartbeat);
        assert_eq!("A".parse::<MsgType>().unwrap(), MsgType::Logon);
        assert_eq!("C".parse::<MsgType>().unwrap(), MsgType::Email);
    }

    #[test]
    fn test_msg_type_is_admin() {
        assert!(MsgType::Logon.is_admin());
        assert!(MsgType::Logout.is_admin());
        assert!(!MsgType::Email.is_admin());
        assert!(MsgType::Custom("U1".to_string()).is_app());
    }

    #[test]
    fn test_msg_type_custom() {
        let custom: MsgType = "XX".parse().unwrap();
        assert!(matches!(custom, MsgType::Custom(_)));
        assert_eq!(custom.as_str(), "XX");
    }

    #[test]
    fn test_set_field_replaces() {
        let mut msg = Message::new(MsgType::Email);
        msg.set_field(tags::SUBJECT, "first");
        msg.set_field(tags::SUBJECT, "second");
        assert_eq!(msg.get_field(tags::SUBJECT), Some("second"));
        assert_eq!(msg.field_count(), 1);
    }

    #[test]
    fn test_set_msg_type_field() {
        let mut msg = Message::new(MsgType::Heartbeat);
        msg.set_field(tags::MSG_TYPE, "5");
        assert_eq!(msg.msg_type(), &MsgType::Logout);
        assert_eq!(msg.get_field(tags::MSG_TYPE), Some("5"));
        assert_eq!(msg.field_count(), 0);
    }

    #[test]
    fn test_wire_fields_header_first() {
        let msg = Message::new(MsgType::Email)
            .with_field(tags::SUBJECT, "Test")
            .with_field(tags::MSG_SEQ_NUM, "7")
            .with_field(tags::SENDER_COMP_ID, "TRADER")
            .with_field(tags::TARGET_COMP_ID, "MARKET");

        let order: Vec<u32> = msg.wire_fields().map(|(t, _)| t).collect();
        assert_eq!(
            order,
            vec![
                tags::SENDER_COMP_ID,
                tags::TARGET_COMP_ID,
                tags::MSG_SEQ_NUM,
                tags::SUBJECT
            ]
        );
    }

    #[test]
    fn test_from_parts_drops_framing() {
        let msg = Message::from_parts(
            "FIX.4.2",
            MsgType::Logon,
            vec![(8, "FIX.4.2".to_string()), (98, "0".to_string()), (10, "123".to_string())],
        );
        assert_eq!(msg.begin_string(), Some("FIX.4.2"));
        assert_eq!(msg.field_count(), 1);
        assert_eq!(msg.get_field_as::<u32>(tags::ENCRYPT_METHOD), Some(0));
    }
}
