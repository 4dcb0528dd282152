/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! The engine: resolved components, connectors and their event stream.

use crate::builder::EngineBuilder;
use crate::connector::{Acceptor, Initiator, ThreadModel};
use crate::error::Result;
use crate::events::{EventDispatcher, EventListener, ListenerId};
use crate::management::{Managed, ManagementRegistry, ObjectName};
use crate::resolver::ResolvedComponents;
use fixgate_core::error::SessionError;
use fixgate_core::message::Message;
use fixgate_core::types::{ConnectionRole, SessionId};
use fixgate_log::LogFactory;
use fixgate_session::settings::SessionSettings;
use fixgate_session::{MessageFactory, Session};
use fixgate_store::MessageStoreFactory;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// A configured FIX engine.
///
/// Holds at most one [`Initiator`] and at most one [`Acceptor`], the
/// components every session is wired with, and the listeners that observe
/// session events. Create one with [`EngineBuilder`].
pub struct Engine {
    uri: String,
    settings: Arc<SessionSettings>,
    components: ResolvedComponents,
    thread_model: ThreadModel,
    initiator: Option<Arc<Initiator>>,
    acceptor: Option<Arc<Acceptor>>,
    dispatcher: Arc<EventDispatcher>,
    management: ManagementRegistry,
    use_management: bool,
    registrations: Mutex<Vec<ObjectName>>,
    lifecycle: tokio::sync::Mutex<()>,
    started: AtomicBool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("uri", &self.uri)
            .field("thread_model", &self.thread_model)
            .field("initiator", &self.initiator)
            .field("acceptor", &self.acceptor)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// Parts assembled by the builder.
pub(crate) struct EngineParts {
    pub uri: String,
    pub settings: Arc<SessionSettings>,
    pub components: ResolvedComponents,
    pub thread_model: ThreadModel,
    pub initiator: Option<Initiator>,
    pub acceptor: Option<Acceptor>,
    pub dispatcher: Arc<EventDispatcher>,
    pub use_management: bool,
}

impl Engine {
    /// Starts building an engine named `uri` from a settings resource.
    #[must_use]
    pub fn builder(uri: impl Into<String>, resource: impl Into<String>) -> EngineBuilder {
        EngineBuilder::new(uri, resource)
    }

    pub(crate) fn from_parts(parts: EngineParts) -> Self {
        Self {
            uri: parts.uri,
            settings: parts.settings,
            components: parts.components,
            thread_model: parts.thread_model,
            initiator: parts.initiator.map(Arc::new),
            acceptor: parts.acceptor.map(Arc::new),
            dispatcher: parts.dispatcher,
            management: ManagementRegistry::new(),
            use_management: parts.use_management,
            registrations: Mutex::new(Vec::new()),
            lifecycle: tokio::sync::Mutex::new(()),
            started: AtomicBool::new(false),
        }
    }

    /// Returns the identifier the engine was built with.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the settings the engine was built from.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Returns the thread model of both connectors.
    #[must_use]
    pub fn thread_model(&self) -> ThreadModel {
        self.thread_model
    }

    /// Returns the initiator, if any session has the initiator role.
    #[must_use]
    pub fn initiator(&self) -> Option<&Initiator> {
        self.initiator.as_deref()
    }

    /// Returns the acceptor, if any session has the acceptor role.
    #[must_use]
    pub fn acceptor(&self) -> Option<&Acceptor> {
        self.acceptor.as_deref()
    }

    /// Returns the message store factory.
    #[must_use]
    pub fn message_store_factory(&self) -> &Arc<dyn MessageStoreFactory> {
        self.components.message_store_factory()
    }

    /// Returns the log factory.
    #[must_use]
    pub fn log_factory(&self) -> &Arc<dyn LogFactory> {
        self.components.log_factory()
    }

    /// Returns the message factory.
    #[must_use]
    pub fn message_factory(&self) -> &Arc<dyn MessageFactory> {
        self.components.message_factory()
    }

    /// Returns the resolved components.
    #[must_use]
    pub fn components(&self) -> &ResolvedComponents {
        &self.components
    }

    /// Returns this engine's management registry.
    #[must_use]
    pub fn management(&self) -> &ManagementRegistry {
        &self.management
    }

    /// Returns the event dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Returns true between a successful `start` and the next `stop`.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Registers a session event listener.
    pub fn add_event_listener<L>(&self, listener: L) -> ListenerId
    where
        L: EventListener + 'static,
    {
        self.dispatcher.add_event_listener(listener)
    }

    /// Unregisters a session event listener.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.dispatcher.remove_event_listener(id)
    }

    /// Returns a session owned by either connector.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.initiator
            .as_ref()
            .and_then(|initiator| initiator.session(id))
            .or_else(|| self.acceptor.as_ref().and_then(|acceptor| acceptor.session(id)))
    }

    /// Sends a message on session `id`.
    ///
    /// # Errors
    /// Returns `SessionError::NotFound` if no connector owns the session,
    /// or the session's send error.
    pub async fn send_to_target(&self, message: Message, id: &SessionId) -> Result<()> {
        let session = self
            .session(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.send(message).await?;
        Ok(())
    }

    /// Starts the acceptor, then the initiator.
    ///
    /// Does nothing if the engine is already started. If the initiator
    /// fails to start, the acceptor is stopped again before the error is
    /// returned.
    ///
    /// # Errors
    /// Returns the connector's error.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_started() {
            return Ok(());
        }

        if let Some(acceptor) = &self.acceptor {
            acceptor.start().await?;
        }
        if let Some(initiator) = &self.initiator {
            if let Err(e) = initiator.start().await {
                if let Some(acceptor) = &self.acceptor {
                    acceptor.stop().await;
                }
                return Err(e);
            }
        }

        if self.use_management {
            self.register_connectors();
        }
        self.started.store(true, Ordering::Release);
        info!(uri = %self.uri, "engine started");
        Ok(())
    }

    /// Stops the acceptor, then the initiator.
    ///
    /// Every logged-on session raises its logoff before this returns.
    /// Stopping an engine that is not running does nothing.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_started() {
            return;
        }

        if let Some(acceptor) = &self.acceptor {
            acceptor.stop().await;
        }
        if let Some(initiator) = &self.initiator {
            initiator.stop().await;
        }

        for name in std::mem::take(&mut *self.registrations.lock()) {
            self.management.unregister(&name);
        }
        self.started.store(false, Ordering::Release);
        info!(uri = %self.uri, "engine stopped");
    }

    fn register_connectors(&self) {
        let mut registrations = self.registrations.lock();
        if let Some(initiator) = &self.initiator {
            let target: Arc<dyn Managed> = Arc::clone(initiator) as Arc<dyn Managed>;
            registrations.push(self.management.register(ConnectionRole::Initiator, target));
        }
        if let Some(acceptor) = &self.acceptor {
            let target: Arc<dyn Managed> = Arc::clone(acceptor) as Arc<dyn Managed>;
            registrations.push(self.management.register(ConnectionRole::Acceptor, target));
        }
        debug!(uri = %self.uri, entries = registrations.len(), "connectors registered");
    }
}
