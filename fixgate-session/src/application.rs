/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Callbacks a session raises while it runs.
//!
//! A session calls into its [`Application`] at each step of the logon
//! bracket and for every message it sends or accepts. Callbacks for one
//! session never overlap.

use async_trait::async_trait;
use fixgate_core::message::Message;
use fixgate_core::types::SessionId;
use std::fmt;

/// Why an application refused an inbound message.
///
/// A refusal is logged against the session; it does not end the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// Text written to the session log.
    pub text: String,
    /// Tag the refusal refers to, if any.
    pub ref_tag: Option<u32>,
}

impl RejectReason {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ref_tag: None,
        }
    }

    /// Points the refusal at `tag`.
    #[must_use]
    pub const fn on_tag(mut self, tag: u32) -> Self {
        self.ref_tag = Some(tag);
        self
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ref_tag {
            Some(tag) => write!(f, "{} (tag {tag})", self.text),
            None => f.write_str(&self.text),
        }
    }
}

impl From<&str> for RejectReason {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Session lifecycle and message callbacks.
#[async_trait]
pub trait Application: Send + Sync {
    /// The session has been built. Raised once per session.
    async fn on_create(&self, session_id: &SessionId);

    /// Both sides have exchanged Logon.
    async fn on_logon(&self, session_id: &SessionId);

    /// A logged on session ended, whatever the cause.
    async fn on_logout(&self, session_id: &SessionId);

    /// An admin message is about to be written. The message may be edited;
    /// sending through the same session from here is not supported.
    async fn to_admin(&self, message: &mut Message, session_id: &SessionId);

    #[allow(clippy::wrong_self_convention)]
    async fn from_admin(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;

    /// An application message is about to be written.
    async fn to_app(&self, message: &mut Message, session_id: &SessionId);

    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;
}

/// Accepts everything and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(&self, _: &Message, _: &SessionId) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(&self, _: &Message, _: &SessionId) -> Result<(), RejectReason> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_core::message::{MsgType, tags};

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::from("unknown desk").to_string(), "unknown desk");
        let reason = RejectReason::new("bad subject").on_tag(tags::SUBJECT);
        assert_eq!(reason.to_string(), "bad subject (tag 147)");
    }

    #[tokio::test]
    async fn test_noop_accepts_everything() {
        let app = NoOpApplication;
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        let mut logon = Message::new(MsgType::Logon);

        app.to_admin(&mut logon, &id).await;
        assert_eq!(logon.field_count(), 0);
        assert!(app.from_admin(&logon, &id).await.is_ok());
        assert!(app.from_app(&Message::new(MsgType::Email), &id).await.is_ok());
    }
}
