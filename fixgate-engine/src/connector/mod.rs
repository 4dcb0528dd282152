/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Initiator and acceptor connectors.
//!
//! A connector owns the sessions of one role and the tasks that move frames
//! between their connections and the session runtime. With
//! [`ThreadModel::SingleThreaded`] every inbound frame of the connector is
//! handled by one processing task fed by a shared queue; with
//! [`ThreadModel::ThreadPerSession`] each connection handles its own frames.

mod acceptor;
mod initiator;

pub use acceptor::Acceptor;
pub use initiator::Initiator;

use crate::management::ConnectorSnapshot;
use bytes::Bytes;
use fixgate_core::error::ConfigError;
use fixgate_core::types::{ConnectionRole, SessionId};
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{Session, SessionFactory};
use fixgate_transport::{Endpoint, FrameReceiver, Transport, TransportProtocol};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// How a connector schedules its sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadModel {
    /// One processing task for all sessions of a connector.
    #[default]
    SingleThreaded,
    /// One processing task per session.
    ThreadPerSession,
}

impl ThreadModel {
    /// Returns the configuration value for this model.
    #[must_use]
    pub const fn as_setting(self) -> &'static str {
        match self {
            Self::SingleThreaded => "SingleThreaded",
            Self::ThreadPerSession => "ThreadPerSession",
        }
    }

    /// Reads the global `ThreadModel` setting.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` for an unknown value.
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, ConfigError> {
        settings
            .get(None, keys::THREAD_MODEL)
            .map_or(Ok(Self::default()), |raw| {
                raw.parse::<Self>().map_err(|value| ConfigError::InvalidSetting {
                    key: keys::THREAD_MODEL.to_string(),
                    value,
                    session: None,
                })
            })
    }
}

impl FromStr for ThreadModel {
    type Err = String;

    /// Ignores case; the rejected value is handed back.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singlethreaded" => Ok(Self::SingleThreaded),
            "threadpersession" => Ok(Self::ThreadPerSession),
            _ => Err(s.to_owned()),
        }
    }
}

impl fmt::Display for ThreadModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting())
    }
}

/// Reads the endpoint of `id` from a protocol, host and port key triple.
fn endpoint(
    settings: &SessionSettings,
    id: &SessionId,
    protocol_key: &str,
    host_key: &str,
    default_host: &str,
    port_key: &str,
) -> Result<Endpoint, ConfigError> {
    let protocol = match settings.get(Some(id), protocol_key) {
        Some(raw) => raw
            .parse::<TransportProtocol>()
            .map_err(|_| ConfigError::InvalidSetting {
                key: protocol_key.to_string(),
                value: raw.to_string(),
                session: Some(id.to_string()),
            })?,
        None => TransportProtocol::default(),
    };
    let host = settings.get(Some(id), host_key).unwrap_or(default_host);
    let port = settings.get_u16(Some(id), port_key)?;
    Ok(Endpoint::new(protocol, host, port))
}

enum Inbound {
    Frame(Bytes),
    Closed,
}

struct Work {
    session: Arc<Session>,
    inbound: Inbound,
}

async fn process(session: &Session, inbound: Inbound) {
    match inbound {
        Inbound::Frame(frame) => {
            if let Err(e) = session.handle_frame(&frame).await {
                warn!(session = %session.id(), error = %e, "session dropped");
            }
        }
        Inbound::Closed => session.disconnect("connection closed").await,
    }
}

/// Route from a connection to the task that handles its frames.
#[derive(Clone)]
enum Worker {
    Shared(mpsc::UnboundedSender<Work>),
    Dedicated,
}

impl Worker {
    async fn deliver(&self, session: &Arc<Session>, inbound: Inbound) {
        match self {
            Self::Shared(queue) => {
                let work = Work {
                    session: Arc::clone(session),
                    inbound,
                };
                if queue.send(work).is_err() {
                    debug!(session = %session.id(), "processing queue closed");
                }
            }
            Self::Dedicated => process(session, inbound).await,
        }
    }
}

/// Moves frames from a connection to its session until the connection ends.
async fn pump(session: Arc<Session>, mut receiver: FrameReceiver, worker: Worker) {
    while let Some(frame) = receiver.recv().await {
        worker.deliver(&session, Inbound::Frame(frame)).await;
    }
    worker.deliver(&session, Inbound::Closed).await;
}

struct Running {
    shutdown: CancellationToken,
    worker: Worker,
}

/// State shared by both connector roles.
struct ConnectorCore {
    role: ConnectionRole,
    thread_model: ThreadModel,
    settings: Arc<SessionSettings>,
    factory: SessionFactory,
    transport: Transport,
    session_ids: Vec<SessionId>,
    sessions: RwLock<BTreeMap<SessionId, Arc<Session>>>,
    /// Listener, processing and connection tasks. Finished tasks leave the
    /// tracker on their own.
    tasks: TaskTracker,
    running: Mutex<Option<Running>>,
}

impl ConnectorCore {
    fn new(
        role: ConnectionRole,
        thread_model: ThreadModel,
        settings: Arc<SessionSettings>,
        session_ids: Vec<SessionId>,
        factory: SessionFactory,
        transport: Transport,
    ) -> Self {
        Self {
            role,
            thread_model,
            settings,
            factory,
            transport,
            session_ids,
            sessions: RwLock::new(BTreeMap::new()),
            tasks: TaskTracker::new(),
            running: Mutex::new(None),
        }
    }

    fn insert(&self, session: Arc<Session>) {
        self.sessions.write().insert(session.id().clone(), session);
    }

    fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).map(Arc::clone)
    }

    fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().map(Arc::clone).collect()
    }

    fn snapshot(&self) -> ConnectorSnapshot {
        let sessions = self.sessions();
        ConnectorSnapshot {
            role: self.role,
            thread_model: self.thread_model,
            sessions: self.session_ids.clone(),
            logged_on: sessions
                .iter()
                .filter(|s| s.is_logged_on())
                .map(|s| s.id().clone())
                .collect(),
        }
    }

    fn is_started(&self) -> bool {
        self.running.lock().is_some()
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    #[cfg(test)]
    fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Marks the connector running and starts its processing task.
    ///
    /// Returns `None` if it is already running.
    fn begin(&self) -> Option<(CancellationToken, Worker)> {
        let mut running = self.running.lock();
        if running.is_some() {
            return None;
        }
        self.tasks.reopen();
        let worker = match self.thread_model {
            ThreadModel::SingleThreaded => {
                let (queue, mut work) = mpsc::unbounded_channel::<Work>();
                self.spawn(async move {
                    while let Some(Work { session, inbound }) = work.recv().await {
                        process(&session, inbound).await;
                    }
                });
                Worker::Shared(queue)
            }
            ThreadModel::ThreadPerSession => Worker::Dedicated,
        };
        let shutdown = CancellationToken::new();
        *running = Some(Running {
            shutdown: shutdown.clone(),
            worker: worker.clone(),
        });
        Some((shutdown, worker))
    }

    /// Disconnects every session and waits for the connector's tasks.
    async fn finish(&self, reason: &str) {
        let Some(Running { shutdown, worker }) = self.running.lock().take() else {
            return;
        };
        shutdown.cancel();
        for session in self.sessions() {
            session.disconnect(reason).await;
        }
        drop(worker);

        self.tasks.close();
        self.tasks.wait().await;
        debug!(role = %self.role, "connector stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_model_parse() {
        assert_eq!("SingleThreaded".parse::<ThreadModel>(), Ok(ThreadModel::SingleThreaded));
        assert_eq!("threadpersession".parse::<ThreadModel>(), Ok(ThreadModel::ThreadPerSession));
        assert_eq!("Pooled".parse::<ThreadModel>(), Err("Pooled".to_string()));
        assert_eq!(ThreadModel::ThreadPerSession.to_string(), "ThreadPerSession");
    }

    #[test]
    fn test_thread_model_from_settings() {
        let mut settings = SessionSettings::new();
        assert_eq!(
            ThreadModel::from_settings(&settings),
            Ok(ThreadModel::SingleThreaded)
        );
        settings.set_default(keys::THREAD_MODEL, "ThreadPerSession");
        assert_eq!(
            ThreadModel::from_settings(&settings),
            Ok(ThreadModel::ThreadPerSession)
        );
        settings.set_default(keys::THREAD_MODEL, "Pooled");
        assert!(matches!(
            ThreadModel::from_settings(&settings),
            Err(ConfigError::InvalidSetting { value, .. }) if value == "Pooled"
        ));
    }

    #[test]
    fn test_endpoint_from_settings() {
        let id = SessionId::new("FIX.4.2", "MARKET", "TRADER");
        let mut settings = SessionSettings::new();
        settings.set_default(keys::SOCKET_ACCEPT_PROTOCOL, "VM_PIPE");
        settings.set(&id, keys::SOCKET_ACCEPT_PORT, "5001");

        let endpoint = endpoint(
            &settings,
            &id,
            keys::SOCKET_ACCEPT_PROTOCOL,
            keys::SOCKET_ACCEPT_ADDRESS,
            "0.0.0.0",
            keys::SOCKET_ACCEPT_PORT,
        )
        .unwrap();
        assert_eq!(endpoint, Endpoint::new(TransportProtocol::VmPipe, "0.0.0.0", 5001));
    }

    #[test]
    fn test_endpoint_errors() {
        let id = SessionId::new("FIX.4.2", "MARKET", "TRADER");
        let mut settings = SessionSettings::new();
        settings.add_session(id.clone());
        let read = |settings: &SessionSettings| {
            endpoint(
                settings,
                &id,
                keys::SOCKET_ACCEPT_PROTOCOL,
                keys::SOCKET_ACCEPT_ADDRESS,
                "0.0.0.0",
                keys::SOCKET_ACCEPT_PORT,
            )
        };

        assert!(matches!(read(&settings), Err(ConfigError::MissingSetting { .. })));
        settings.set(&id, keys::SOCKET_ACCEPT_PORT, "eighty");
        assert!(matches!(read(&settings), Err(ConfigError::InvalidSetting { .. })));
        settings.set(&id, keys::SOCKET_ACCEPT_PORT, "80");
        settings.set(&id, keys::SOCKET_ACCEPT_PROTOCOL, "SCTP");
        assert!(matches!(read(&settings), Err(ConfigError::InvalidSetting { .. })));
    }
}
