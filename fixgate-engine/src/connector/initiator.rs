/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Initiating connector.

use super::{ConnectorCore, ThreadModel, Worker, endpoint, pump};
use crate::error::EngineError;
use crate::management::{ConnectorSnapshot, Managed};
use fixgate_core::types::{ConnectionRole, SessionId};
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{Session, SessionFactory};
use fixgate_transport::{Endpoint, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Host dialled when `SocketConnectHost` is not set.
pub const DEFAULT_CONNECT_HOST: &str = "127.0.0.1";

/// Connector for sessions that open the connection.
///
/// Sessions are created when the initiator starts. Each one dials its
/// counterparty and sends Logon once connected; a lost connection is
/// retried every `ReconnectInterval` seconds until the initiator stops.
pub struct Initiator {
    core: Arc<ConnectorCore>,
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("thread_model", &self.core.thread_model)
            .field("sessions", &self.core.session_ids)
            .finish_non_exhaustive()
    }
}

impl Initiator {
    pub(crate) fn new(
        thread_model: ThreadModel,
        settings: Arc<SessionSettings>,
        session_ids: Vec<SessionId>,
        factory: SessionFactory,
        transport: Transport,
    ) -> Self {
        Self {
            core: Arc::new(ConnectorCore::new(
                ConnectionRole::Initiator,
                thread_model,
                settings,
                session_ids,
                factory,
                transport,
            )),
        }
    }

    /// Returns the thread model.
    #[must_use]
    pub fn thread_model(&self) -> ThreadModel {
        self.core.thread_model
    }

    /// Returns the configured session identifiers.
    #[must_use]
    pub fn session_ids(&self) -> &[SessionId] {
        &self.core.session_ids
    }

    /// Returns a session created by this initiator.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.core.session(id)
    }

    /// Returns every session created so far.
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.core.sessions()
    }

    /// Returns true while the initiator is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.core.is_started()
    }

    /// Creates the sessions and starts dialling.
    ///
    /// # Errors
    /// Returns `EngineError::Config` if a session has no usable connect
    /// endpoint, or `EngineError::Factory` if a session cannot be created.
    /// Nothing is started in either case.
    pub async fn start(&self) -> Result<(), EngineError> {
        if self.core.is_started() {
            return Ok(());
        }

        let mut targets = Vec::with_capacity(self.core.session_ids.len());
        for id in &self.core.session_ids {
            let endpoint = endpoint(
                &self.core.settings,
                id,
                keys::SOCKET_CONNECT_PROTOCOL,
                keys::SOCKET_CONNECT_HOST,
                DEFAULT_CONNECT_HOST,
                keys::SOCKET_CONNECT_PORT,
            )?;
            targets.push((id, endpoint));
        }

        let mut sessions = Vec::with_capacity(targets.len());
        for (id, endpoint) in targets {
            let session = match self.core.session(id) {
                Some(session) => session,
                None => {
                    let session = self.core.factory.create(id, &self.core.settings).await?;
                    self.core.insert(Arc::clone(&session));
                    session
                }
            };
            sessions.push((session, endpoint));
        }

        let Some((shutdown, worker)) = self.core.begin() else {
            return Ok(());
        };
        for (session, endpoint) in sessions {
            info!(session = %session.id(), %endpoint, "initiating");
            self.core.spawn(dial(
                Arc::clone(&self.core),
                session,
                endpoint,
                shutdown.clone(),
                worker.clone(),
            ));
        }
        Ok(())
    }

    /// Disconnects every session and stops dialling.
    pub async fn stop(&self) {
        self.core.finish("initiator stopping").await;
    }
}

impl Managed for Initiator {
    fn snapshot(&self) -> ConnectorSnapshot {
        self.core.snapshot()
    }
}

/// Connects, logs on and pumps one session until shutdown.
async fn dial(
    core: Arc<ConnectorCore>,
    session: Arc<Session>,
    endpoint: Endpoint,
    shutdown: CancellationToken,
    worker: Worker,
) {
    let retry = session.config().reconnect_interval;
    loop {
        match core.transport.connect(&endpoint).await {
            Ok(connection) => {
                let (sender, receiver) = connection.split();
                match session.attach(sender.clone()) {
                    Ok(()) => {
                        if let Err(e) = session.logon().await {
                            warn!(session = %session.id(), error = %e, "logon not sent");
                        }
                        tokio::select! {
                            () = shutdown.cancelled() => {
                                session.disconnect("initiator stopping").await;
                                return;
                            }
                            () = pump(Arc::clone(&session), receiver, worker.clone()) => {}
                        }
                    }
                    Err(e) => {
                        warn!(session = %session.id(), error = %e, "cannot attach connection");
                        sender.close();
                    }
                }
            }
            Err(e) => debug!(session = %session.id(), %endpoint, error = %e, "connect failed"),
        }

        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(retry) => {}
        }
    }
}
