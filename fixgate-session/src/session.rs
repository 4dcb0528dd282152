/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session runtime.
//!
//! A [`Session`] owns its store, log and application callbacks and drives
//! the logon bracket over whatever transport is attached to it. Inbound
//! frames are handed to [`Session::handle_frame`] by the connector that
//! owns the connection.
//!
//! Frames written while an inbound frame is being handled are queued and
//! flushed only after every callback for that frame has returned. The peer
//! therefore never observes a reply before this side has finished raising
//! its own callbacks.

use crate::application::Application;
use crate::config::SessionConfig;
use crate::message_factory::MessageFactory;
use crate::sequence::SequenceResult;
use crate::state::SessionStatus;
use bytes::Bytes;
use fixgate_core::error::SessionError;
use fixgate_core::message::{Message, MsgType, tags};
use fixgate_core::types::{ConnectionRole, SessionId, Timestamp};
use fixgate_log::Log;
use fixgate_store::MessageStore;
use fixgate_tagvalue::{decode_message, encode_message};
use fixgate_transport::FrameSender;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Link {
    status: SessionStatus,
    sender: Option<FrameSender>,
    outbox: Option<Vec<Bytes>>,
}

/// What to do with the connection after an inbound message.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Continue,
    Disconnect(String),
}

/// A FIX session bound to one counterparty.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    store: Arc<dyn MessageStore>,
    log: Arc<dyn Log>,
    message_factory: Arc<dyn MessageFactory>,
    application: Arc<dyn Application>,
    link: Mutex<Link>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.config.role)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        store: Arc<dyn MessageStore>,
        log: Arc<dyn Log>,
        message_factory: Arc<dyn MessageFactory>,
        application: Arc<dyn Application>,
    ) -> Self {
        Self {
            id,
            config,
            store,
            log,
            message_factory,
            application,
            link: Mutex::new(Link::default()),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the connection role.
    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.config.role
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.link.lock().status
    }

    /// Returns true while the logon bracket is open.
    #[must_use]
    pub fn is_logged_on(&self) -> bool {
        self.status().is_logged_on()
    }

    /// Returns the message store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Returns the session log.
    #[must_use]
    pub fn log(&self) -> &Arc<dyn Log> {
        &self.log
    }

    /// Attaches a transport to the session.
    ///
    /// # Errors
    /// Returns `SessionError::Connection` if a live transport is already
    /// attached.
    pub fn attach(&self, sender: FrameSender) -> Result<(), SessionError> {
        let mut link = self.link.lock();
        if link.sender.as_ref().is_some_and(|s| !s.is_closed()) {
            return Err(SessionError::Connection(format!(
                "{} already has a connection",
                self.id
            )));
        }
        debug!(session = %self.id, peer = sender.peer(), "transport attached");
        link.sender = Some(sender);
        link.status = SessionStatus::Connected;
        drop(link);
        self.log.on_event("Connected");
        Ok(())
    }

    /// Sends a Logon to open the bracket from the initiating side.
    ///
    /// # Errors
    /// Returns `SessionError` if no transport is attached or the message
    /// cannot be written.
    pub async fn logon(&self) -> Result<(), SessionError> {
        let mut logon = self.new_message(MsgType::Logon);
        logon.set_field(tags::ENCRYPT_METHOD, "0");
        logon.set_field(
            tags::HEART_BT_INT,
            self.config.heartbeat_interval_secs().to_string(),
        );
        if self.config.reset_on_logon {
            self.store.reset().await?;
            logon.set_field(tags::RESET_SEQ_NUM_FLAG, "Y");
        }
        self.log.on_event("Initiated logon request");
        self.send_admin(logon, Some(SessionStatus::LogonSent)).await
    }

    /// Sends a Logout and waits for the counterparty to confirm it.
    ///
    /// # Errors
    /// Returns `SessionError::NotConnected` if the session is not logged on.
    pub async fn logout(&self, text: Option<&str>) -> Result<(), SessionError> {
        if !self.is_logged_on() {
            return Err(SessionError::NotConnected(self.id.to_string()));
        }
        let mut logout = self.new_message(MsgType::Logout);
        if let Some(text) = text {
            logout.set_field(tags::TEXT, text);
        }
        self.send_admin(logout, Some(SessionStatus::LogoutSent))
            .await
    }

    /// Sends a message to the counterparty.
    ///
    /// Application messages require an open logon bracket.
    ///
    /// # Errors
    /// Returns `SessionError::NotConnected` if the session cannot send, or
    /// an encoding or store error.
    pub async fn send(&self, message: Message) -> Result<(), SessionError> {
        if message.is_admin() {
            return self.send_admin(message, None).await;
        }
        if !self.is_logged_on() {
            return Err(SessionError::NotConnected(self.id.to_string()));
        }
        let mut message = message;
        self.fill_header(&mut message);
        self.application.to_app(&mut message, &self.id).await;
        self.transmit(message, None).await
    }

    /// Handles one complete inbound frame.
    ///
    /// Garbled frames are logged and ignored. A protocol violation ends the
    /// connection.
    ///
    /// # Errors
    /// Returns the `SessionError` that caused the disconnect, if any.
    pub async fn handle_frame(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.log.on_incoming(&String::from_utf8_lossy(frame));
        let message = match decode_message(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(session = %self.id, error = %e, "ignoring garbled message");
                self.log.on_event(&format!("Garbled message: {e}"));
                return Ok(());
            }
        };

        self.link.lock().outbox = Some(Vec::new());
        match self.process(message).await {
            Ok(Disposition::Continue) => {
                self.flush();
                Ok(())
            }
            Ok(Disposition::Disconnect(reason)) => {
                self.disconnect(&reason).await;
                Ok(())
            }
            Err(e) => {
                self.disconnect(&e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Drops the transport.
    ///
    /// `on_logout` is raised once if the logon bracket was open. Frames still
    /// queued from the inbound message being handled are written after that
    /// callback returns and before the transport is closed, so the peer only
    /// sees the final Logout once this side has finished its own logoff.
    /// Repeated calls are no-ops.
    pub async fn disconnect(&self, reason: &str) {
        let (was, sender, pending) = {
            let mut link = self.link.lock();
            let was = std::mem::take(&mut link.status);
            (was, link.sender.take(), link.outbox.take())
        };
        if sender.is_none() && !was.is_connected() {
            return;
        }

        info!(session = %self.id, reason, "session disconnected");
        self.log.on_event(&format!("Disconnecting: {reason}"));
        if was.is_logged_on() {
            self.application.on_logout(&self.id).await;
        }
        if let Some(sender) = sender {
            for frame in pending.into_iter().flatten() {
                if sender.send(frame).is_err() {
                    break;
                }
            }
            sender.close();
        }
    }

    fn new_message(&self, msg_type: MsgType) -> Message {
        self.message_factory
            .create(&self.id.begin_string, msg_type)
    }

    fn fill_header(&self, message: &mut Message) {
        message.set_field(tags::SENDER_COMP_ID, self.id.sender_comp_id.as_str());
        message.set_field(tags::TARGET_COMP_ID, self.id.target_comp_id.as_str());
        if let Some(sub) = &self.id.sender_sub_id {
            message.set_field(tags::SENDER_SUB_ID, sub.as_str());
        }
        if let Some(sub) = &self.id.target_sub_id {
            message.set_field(tags::TARGET_SUB_ID, sub.as_str());
        }
        message.set_field(tags::SENDING_TIME, Timestamp::now().to_string());
    }

    async fn send_admin(
        &self,
        mut message: Message,
        status: Option<SessionStatus>,
    ) -> Result<(), SessionError> {
        self.fill_header(&mut message);
        self.application.to_admin(&mut message, &self.id).await;
        self.transmit(message, status).await
    }

    /// Numbers, encodes and writes a message in one critical section so that
    /// concurrent senders cannot reorder sequence numbers on the wire.
    async fn transmit(
        &self,
        mut message: Message,
        status: Option<SessionStatus>,
    ) -> Result<(), SessionError> {
        let (seq, frame) = {
            let mut link = self.link.lock();
            let Some(sender) = link.sender.clone() else {
                return Err(SessionError::NotConnected(self.id.to_string()));
            };
            let seq = self.store.next_sender_seq();
            message.set_field(tags::MSG_SEQ_NUM, seq.to_string());
            let frame = encode_message(&self.id.begin_string, &message)?.freeze();
            self.store.set_next_sender_seq(seq + 1)?;
            if let Some(status) = status {
                link.status = status;
            }
            match link.outbox.as_mut() {
                Some(outbox) => outbox.push(frame.clone()),
                None => sender
                    .send(frame.clone())
                    .map_err(|e| SessionError::Connection(e.to_string()))?,
            }
            (seq, frame)
        };

        self.log.on_outgoing(&String::from_utf8_lossy(&frame));
        if let Err(e) = self.store.store(seq, &frame).await {
            warn!(session = %self.id, seq, error = %e, "failed to persist outbound message");
        }
        Ok(())
    }

    fn flush(&self) {
        let mut link = self.link.lock();
        let Some(frames) = link.outbox.take() else {
            return;
        };
        let Some(sender) = link.sender.as_ref() else {
            return;
        };
        for frame in frames {
            if let Err(e) = sender.send(frame) {
                warn!(session = %self.id, error = %e, "dropping queued frame");
                break;
            }
        }
    }

    async fn process(&self, message: Message) -> Result<Disposition, SessionError> {
        if message.get_field(tags::SENDER_COMP_ID) != Some(self.id.target_comp_id.as_str())
            || message.get_field(tags::TARGET_COMP_ID) != Some(self.id.sender_comp_id.as_str())
        {
            return Ok(Disposition::Disconnect("CompID problem".to_string()));
        }

        let msg_type = message.msg_type().clone();
        let status = self.status();
        if !status.is_logged_on() && msg_type != MsgType::Logon {
            return Ok(Disposition::Disconnect(format!(
                "received {msg_type} before logon"
            )));
        }

        if msg_type == MsgType::SequenceReset {
            return self.on_sequence_reset(&message).await;
        }

        if msg_type == MsgType::Logon
            && message.get_field(tags::RESET_SEQ_NUM_FLAG) == Some("Y")
            && self.config.role == ConnectionRole::Acceptor
        {
            self.store.reset().await?;
        }

        let Some(received) = message.get_field_as::<u64>(tags::MSG_SEQ_NUM) else {
            return Ok(Disposition::Disconnect("missing MsgSeqNum".to_string()));
        };
        match SequenceResult::check(self.store.next_target_seq(), received) {
            SequenceResult::Ok => self.store.set_next_target_seq(received + 1)?,
            SequenceResult::TooLow { expected, received } => {
                if message.get_field(tags::POSS_DUP_FLAG) == Some("Y") {
                    debug!(session = %self.id, received, "ignoring possible duplicate");
                    return Ok(Disposition::Continue);
                }
                return Err(SessionError::SequenceTooLow { expected, received });
            }
            SequenceResult::Gap { expected, received } => {
                warn!(session = %self.id, expected, received, "sequence gap accepted");
                self.log.on_event(&format!(
                    "MsgSeqNum too high, expecting {expected} but received {received}"
                ));
                self.store.set_next_target_seq(received + 1)?;
            }
        }

        if !message.is_admin() {
            if let Err(reason) = self.application.from_app(&message, &self.id).await {
                warn!(session = %self.id, reason = %reason.text, "application rejected message");
                self.log.on_event(&format!("Rejected: {}", reason.text));
            }
            return Ok(Disposition::Continue);
        }

        if let Err(reason) = self.application.from_admin(&message, &self.id).await {
            warn!(session = %self.id, reason = %reason.text, "application rejected admin message");
            if msg_type == MsgType::Logon {
                return Err(SessionError::LogonRejected {
                    reason: reason.text,
                });
            }
            return Ok(Disposition::Continue);
        }

        match msg_type {
            MsgType::Logon => self.on_logon(&message, status).await,
            MsgType::TestRequest => {
                let mut heartbeat = self.new_message(MsgType::Heartbeat);
                if let Some(id) = message.get_field(tags::TEST_REQ_ID) {
                    heartbeat.set_field(tags::TEST_REQ_ID, id);
                }
                self.send_admin(heartbeat, None).await?;
                Ok(Disposition::Continue)
            }
            MsgType::Logout => {
                if status == SessionStatus::LogoutSent {
                    return Ok(Disposition::Disconnect("logout confirmed".to_string()));
                }
                let logout = self.new_message(MsgType::Logout);
                self.send_admin(logout, None).await?;
                Ok(Disposition::Disconnect("logout requested".to_string()))
            }
            MsgType::ResendRequest => {
                self.log.on_event("Resend request received and not serviced");
                Ok(Disposition::Continue)
            }
            _ => Ok(Disposition::Continue),
        }
    }

    async fn on_logon(
        &self,
        message: &Message,
        status: SessionStatus,
    ) -> Result<Disposition, SessionError> {
        match (self.config.role, status) {
            (ConnectionRole::Acceptor, SessionStatus::Connected) => {
                let mut reply = self.new_message(MsgType::Logon);
                reply.set_field(tags::ENCRYPT_METHOD, "0");
                let heartbeat = message
                    .get_field(tags::HEART_BT_INT)
                    .map_or_else(|| self.config.heartbeat_interval_secs().to_string(), str::to_string);
                reply.set_field(tags::HEART_BT_INT, heartbeat);
                if message.get_field(tags::RESET_SEQ_NUM_FLAG) == Some("Y") {
                    reply.set_field(tags::RESET_SEQ_NUM_FLAG, "Y");
                }
                self.send_admin(reply, Some(SessionStatus::LoggedOn)).await?;
            }
            (ConnectionRole::Initiator, SessionStatus::LogonSent) => {
                self.link.lock().status = SessionStatus::LoggedOn;
            }
            _ => {
                warn!(session = %self.id, %status, "unexpected logon");
                return Ok(Disposition::Continue);
            }
        }

        info!(session = %self.id, "logon complete");
        self.log.on_event("Logon contact established");
        self.application.on_logon(&self.id).await;
        Ok(Disposition::Continue)
    }

    async fn on_sequence_reset(&self, message: &Message) -> Result<Disposition, SessionError> {
        if let Err(reason) = self.application.from_admin(message, &self.id).await {
            warn!(session = %self.id, reason = %reason.text, "application rejected sequence reset");
            return Ok(Disposition::Continue);
        }
        let Some(new_seq) = message.get_field_as::<u64>(tags::NEW_SEQ_NO) else {
            return Ok(Disposition::Disconnect("SequenceReset without NewSeqNo".to_string()));
        };
        let expected = self.store.next_target_seq();
        if new_seq > expected {
            self.store.set_next_target_seq(new_seq)?;
            self.log.on_event(&format!("Sequence reset from {expected} to {new_seq}"));
        }
        Ok(Disposition::Continue)
    }
}
