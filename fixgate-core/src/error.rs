/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Error hierarchy shared by the fixgate crates.
//!
//! Each layer has its own enum; [`FixError`] wraps them for callers that do
//! not care which layer failed.

use std::ops::Range;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FixError>;

/// Any fixgate failure.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading settings or resolving engine components.
///
/// Configuration errors are never retried; they abort engine construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More than one implementation is implied by the configuration.
    #[error("Ambiguous {category} implied in configuration")]
    Ambiguous {
        /// The component category, e.g. "message store" or "log".
        category: &'static str,
    },

    /// A required setting is absent.
    #[error("missing setting {key}{}", scope_suffix(.session))]
    MissingSetting {
        /// The setting key.
        key: String,
        /// The session the lookup was made for, if any.
        session: Option<String>,
    },

    /// A setting is present but cannot be converted.
    #[error("invalid value '{value}' for setting {key}{}", scope_suffix(.session))]
    InvalidSetting {
        /// The setting key.
        key: String,
        /// The offending raw value.
        value: String,
        /// The session the lookup was made for, if any.
        session: Option<String>,
    },

    /// The settings resource could not be located or read.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The settings document is malformed.
    #[error("malformed settings: {0}")]
    Malformed(String),
}

fn scope_suffix(session: &Option<String>) -> String {
    session
        .as_ref()
        .map(|s| format!(" for session {s}"))
        .unwrap_or_default()
}

/// A frame that could not be turned into a [`Message`](crate::Message).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ends before the CheckSum field.
    #[error("incomplete message, need more data")]
    Incomplete,

    #[error("invalid begin string: expected 8=FIX.x.y")]
    InvalidBeginString,

    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// BodyLength is not a number or does not match the body.
    #[error("invalid body length value")]
    InvalidBodyLength,

    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch { calculated: u8, declared: u8 },

    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue { tag: u32, reason: String },

    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// An outbound message that cannot be written as tag=value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("field value for tag {tag} contains the SOH delimiter")]
    EmbeddedDelimiter { tag: u32 },
}

/// Failures of a running session or of a lookup by session id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No connector owns a session with this id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The session has no live transport to write to.
    #[error("session {0} is not connected")]
    NotConnected(String),

    #[error("logon rejected: {reason}")]
    LogonRejected { reason: String },

    /// The counterparty reused a sequence number without PossDupFlag.
    #[error("sequence too low: expected >= {expected}, received {received}")]
    SequenceTooLow { expected: u64, received: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("cannot encode outbound message: {0}")]
    Encode(#[from] EncodeError),

    #[error("session store failure: {0}")]
    Store(#[from] StoreError),
}

/// Message store failures.
///
/// Backend errors are flattened to strings so the enum stays `Clone`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("failed to store message seq={seq_num}: {reason}")]
    StoreFailed { seq_num: u64, reason: String },

    #[error("messages not available for range: {range:?}")]
    RangeNotAvailable { range: Range<u64> },

    /// Persisted state could not be read back.
    #[error("store corrupted: {reason}")]
    Corrupted { reason: String },

    /// Only `sqlite` is compiled in.
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("store database error: {0}")]
    Database(String),

    #[error("store i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_display() {
        let err = ConfigError::Ambiguous {
            category: "message store",
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous message store implied in configuration"
        );
    }

    #[test]
    fn test_missing_setting_display() {
        let err = ConfigError::MissingSetting {
            key: "SocketAcceptPort".to_string(),
            session: Some("FIX.4.4:FOO->BAR".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "missing setting SocketAcceptPort for session FIX.4.4:FOO->BAR"
        );

        let err = ConfigError::MissingSetting {
            key: "ThreadModel".to_string(),
            session: None,
        };
        assert_eq!(err.to_string(), "missing setting ThreadModel");
    }

    #[test]
    fn test_fix_error_from_config() {
        let err: FixError = ConfigError::InvalidArgument("bogus.toml".to_string()).into();
        assert!(matches!(err, FixError::Config(ConfigError::InvalidArgument(_))));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumMismatch {
            calculated: 100,
            declared: 200,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: calculated 100, declared 200"
        );
    }

    #[test]
    fn test_store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io.into();
        assert_eq!(err.to_string(), "store i/o error: gone");
    }
}
