/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Accepting connector.

use super::{ConnectorCore, Inbound, ThreadModel, Worker, endpoint, pump};
use crate::error::EngineError;
use crate::management::{ConnectorSnapshot, Managed};
use fixgate_core::message::tags;
use fixgate_core::types::{ConnectionRole, SessionId};
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{Session, SessionFactory};
use fixgate_tagvalue::decode_message;
use fixgate_transport::{Connection, Endpoint, Listener, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Address listened on when `SocketAcceptAddress` is not set.
pub const DEFAULT_ACCEPT_ADDRESS: &str = "0.0.0.0";

/// Connector for sessions that wait for the counterparty to connect.
///
/// Sessions are created with the acceptor. One listener is bound per
/// distinct accept endpoint, and an inbound connection is bound to the
/// session named by the comp ids of its first message.
pub struct Acceptor {
    core: Arc<ConnectorCore>,
    endpoints: Vec<Endpoint>,
}

impl std::fmt::Debug for Acceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acceptor")
            .field("thread_model", &self.core.thread_model)
            .field("endpoints", &self.endpoints)
            .field("sessions", &self.core.session_ids)
            .finish_non_exhaustive()
    }
}

impl Acceptor {
    /// Reads the accept endpoints and creates every session.
    ///
    /// # Errors
    /// Returns `EngineError::Config` if a session lacks a valid
    /// `SocketAcceptPort` or protocol, or `EngineError::Factory` if a
    /// session cannot be created.
    pub(crate) async fn new(
        thread_model: ThreadModel,
        settings: Arc<SessionSettings>,
        session_ids: Vec<SessionId>,
        factory: SessionFactory,
        transport: Transport,
    ) -> Result<Self, EngineError> {
        let mut endpoints = Vec::new();
        for id in &session_ids {
            let endpoint = endpoint(
                &settings,
                id,
                keys::SOCKET_ACCEPT_PROTOCOL,
                keys::SOCKET_ACCEPT_ADDRESS,
                DEFAULT_ACCEPT_ADDRESS,
                keys::SOCKET_ACCEPT_PORT,
            )?;
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }

        let core = Arc::new(ConnectorCore::new(
            ConnectionRole::Acceptor,
            thread_model,
            settings,
            session_ids,
            factory,
            transport,
        ));
        for id in &core.session_ids {
            let session = core.factory.create(id, &core.settings).await?;
            core.insert(session);
        }
        Ok(Self { core, endpoints })
    }

    /// Returns the thread model.
    #[must_use]
    pub fn thread_model(&self) -> ThreadModel {
        self.core.thread_model
    }

    /// Returns the distinct endpoints the acceptor listens on.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Returns the configured session identifiers.
    #[must_use]
    pub fn session_ids(&self) -> &[SessionId] {
        &self.core.session_ids
    }

    /// Returns a session of this acceptor.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.core.session(id)
    }

    /// Returns every session of this acceptor.
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.core.sessions()
    }

    /// Returns true while the acceptor is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.core.is_started()
    }

    /// Binds every endpoint and starts accepting connections.
    ///
    /// # Errors
    /// Returns `EngineError::Transport` if an endpoint cannot be bound.
    /// Listeners bound before the failure are released.
    pub async fn start(&self) -> Result<(), EngineError> {
        if self.core.is_started() {
            return Ok(());
        }

        let mut listeners = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            listeners.push(self.core.transport.bind(endpoint).await?);
        }

        let Some((shutdown, worker)) = self.core.begin() else {
            return Ok(());
        };
        for listener in listeners {
            info!(address = %listener.local_addr(), "accepting connections");
            self.core.spawn(accept(
                Arc::clone(&self.core),
                listener,
                shutdown.clone(),
                worker.clone(),
            ));
        }
        Ok(())
    }

    /// Releases the listeners and disconnects every session.
    pub async fn stop(&self) {
        self.core.finish("acceptor stopping").await;
    }
}

impl Managed for Acceptor {
    fn snapshot(&self) -> ConnectorSnapshot {
        self.core.snapshot()
    }
}

async fn accept(
    core: Arc<ConnectorCore>,
    mut listener: Listener,
    shutdown: CancellationToken,
    worker: Worker,
) {
    loop {
        let connection = tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Some(connection) => connection,
                None => break,
            },
        };
        debug!(peer = connection.peer(), "inbound connection");
        let task = serve(Arc::clone(&core), connection, shutdown.clone(), worker.clone());
        core.spawn(task);
    }
    debug!(address = %listener.local_addr(), "listener released");
}

/// Binds a connection to its session on the first frame, then pumps it.
async fn serve(
    core: Arc<ConnectorCore>,
    connection: Connection,
    shutdown: CancellationToken,
    worker: Worker,
) {
    let peer = connection.peer().to_string();
    let (sender, mut receiver) = connection.split();
    let first = tokio::select! {
        () = shutdown.cancelled() => None,
        frame = receiver.recv() => frame,
    };
    let Some(first) = first else {
        sender.close();
        return;
    };

    let Some(session) = identify(&core, &first) else {
        warn!(peer = %peer, "no session matches inbound connection");
        sender.close();
        return;
    };
    if let Err(e) = session.attach(sender.clone()) {
        warn!(peer = %peer, session = %session.id(), error = %e, "rejecting connection");
        sender.close();
        return;
    }

    worker.deliver(&session, Inbound::Frame(first)).await;
    tokio::select! {
        () = shutdown.cancelled() => session.disconnect("acceptor stopping").await,
        () = pump(Arc::clone(&session), receiver, worker) => {}
    }
}

/// Finds the session addressed by a frame's header.
fn identify(core: &ConnectorCore, frame: &[u8]) -> Option<Arc<Session>> {
    let message = decode_message(frame).ok()?;
    let id = SessionId {
        begin_string: message.begin_string()?.to_string(),
        sender_comp_id: message.get_field(tags::TARGET_COMP_ID)?.to_string(),
        target_comp_id: message.get_field(tags::SENDER_COMP_ID)?.to_string(),
        sender_sub_id: message.get_field(tags::TARGET_SUB_ID).map(str::to_string),
        target_sub_id: message.get_field(tags::SENDER_SUB_ID).map(str::to_string),
    };
    core.session(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fixgate_log::StructuredLogFactory;
    use fixgate_session::{DefaultMessageFactory, NoOpApplication};
    use fixgate_store::MemoryStoreFactory;
    use fixgate_transport::PipeHub;
    use std::time::Duration;

    const PORT: u16 = 7301;

    async fn acceptor(hub: &Arc<PipeHub>) -> Acceptor {
        let id = SessionId::new("FIX.4.2", "MARKET", "TRADER");
        let mut settings = SessionSettings::new();
        settings.set(&id, keys::CONNECTION_TYPE, "acceptor");
        settings.set(&id, keys::SOCKET_ACCEPT_PROTOCOL, "VM_PIPE");
        settings.set(&id, keys::SOCKET_ACCEPT_PORT, &PORT.to_string());
        let factory = SessionFactory::new(
            Arc::new(NoOpApplication),
            Arc::new(MemoryStoreFactory),
            Arc::new(StructuredLogFactory::new("test")),
            Arc::new(DefaultMessageFactory),
        );
        Acceptor::new(
            ThreadModel::SingleThreaded,
            Arc::new(settings),
            vec![id],
            factory,
            Transport::new(Arc::clone(hub)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_finished_connections_are_released() {
        let hub = Arc::new(PipeHub::new());
        let acceptor = acceptor(&hub).await;
        acceptor.start().await.unwrap();
        let baseline = acceptor.core.task_count();
        assert_eq!(baseline, 2);

        for _ in 0..200 {
            let (sender, _receiver) = hub.connect(PORT).unwrap().split();
            sender.send(Bytes::from_static(b"not a fix frame")).unwrap();
            sender.close();
        }

        let settled = tokio::time::timeout(Duration::from_secs(5), async {
            while acceptor.core.task_count() > baseline {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(settled.is_ok(), "{} tasks still tracked", acceptor.core.task_count());

        acceptor.stop().await;
        assert_eq!(acceptor.core.task_count(), 0);
        assert!(!hub.is_bound(PORT));
    }
}
