/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session event fan-out.
//!
//! The [`EventDispatcher`] is the [`Application`] every session of an engine
//! reports to. Each callback is republished as an [`EventCategory`] to the
//! listeners registered at the time it is raised, in the order the sessions
//! raised them.
//!
//! Deliveries are serialized by a re-entrant lock: two sessions never
//! interleave inside one listener call, while a listener that itself causes
//! an event (for example by sending a message) is delivered to on the same
//! thread without deadlocking. A listener that fails or panics is logged and
//! skipped; the remaining listeners still see the event.

use async_trait::async_trait;
use fixgate_core::message::Message;
use fixgate_core::types::SessionId;
use fixgate_session::{Application, RejectReason};
use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// What happened to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// The session was created.
    SessionCreated,
    /// An administrative message is about to be sent.
    AdminMessageSent,
    /// An administrative message was received.
    AdminMessageReceived,
    /// The logon handshake completed.
    SessionLogon,
    /// An application message is about to be sent.
    AppMessageSent,
    /// An application message was received.
    AppMessageReceived,
    /// The logon bracket closed.
    SessionLogoff,
}

impl EventCategory {
    /// Returns true if events of this category carry a message.
    #[must_use]
    pub const fn carries_message(self) -> bool {
        !matches!(
            self,
            Self::SessionCreated | Self::SessionLogon | Self::SessionLogoff
        )
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SessionCreated => "SessionCreated",
            Self::AdminMessageSent => "AdminMessageSent",
            Self::AdminMessageReceived => "AdminMessageReceived",
            Self::SessionLogon => "SessionLogon",
            Self::AppMessageSent => "AppMessageSent",
            Self::AppMessageReceived => "AppMessageReceived",
            Self::SessionLogoff => "SessionLogoff",
        };
        f.write_str(name)
    }
}

/// An owned copy of one delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event category.
    pub category: EventCategory,
    /// Session that raised the event.
    pub session_id: SessionId,
    /// Message for message-carrying categories.
    pub message: Option<Message>,
}

impl EventRecord {
    /// Copies an event as seen by a listener.
    #[must_use]
    pub fn new(category: EventCategory, session_id: &SessionId, message: Option<&Message>) -> Self {
        Self {
            category,
            session_id: session_id.clone(),
            message: message.cloned(),
        }
    }
}

/// Outcome of a listener call.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives session events.
pub trait EventListener: Send + Sync {
    /// Handles one event. `message` is `None` for lifecycle categories.
    ///
    /// # Errors
    /// An error is logged by the dispatcher and does not stop delivery to
    /// other listeners.
    fn on_event(
        &self,
        category: EventCategory,
        session_id: &SessionId,
        message: Option<&Message>,
    ) -> ListenerResult;
}

impl<F> EventListener for F
where
    F: Fn(EventCategory, &SessionId, Option<&Message>) -> ListenerResult + Send + Sync,
{
    fn on_event(
        &self,
        category: EventCategory,
        session_id: &SessionId,
        message: Option<&Message>,
    ) -> ListenerResult {
        self(category, session_id, message)
    }
}

/// Handle returned by [`EventDispatcher::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Entry = (ListenerId, Arc<dyn EventListener>);

/// Fan-out point for session events. One per engine.
pub struct EventDispatcher {
    listeners: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    delivery: ReentrantMutex<()>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Registers a listener. It receives events raised after this call.
    pub fn add_event_listener<L>(&self, listener: L) -> ListenerId
    where
        L: EventListener + 'static,
    {
        self.add_shared_listener(Arc::new(listener))
    }

    /// Registers a listener that is shared with the caller.
    pub fn add_shared_listener(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(entry, _)| *entry != id);
        listeners.len() != before
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Delivers one event to every registered listener.
    pub fn dispatch(&self, category: EventCategory, session_id: &SessionId, message: Option<&Message>) {
        let _delivery = self.delivery.lock();
        let listeners: Vec<Entry> = self.listeners.read().clone();

        for (id, listener) in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                listener.on_event(category, session_id, message)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    listener = id.0,
                    %category,
                    session = %session_id,
                    error = %e,
                    "event listener failed"
                ),
                Err(_) => warn!(
                    listener = id.0,
                    %category,
                    session = %session_id,
                    "event listener panicked"
                ),
            }
        }
    }
}

#[async_trait]
impl Application for EventDispatcher {
    async fn on_create(&self, session_id: &SessionId) {
        self.dispatch(EventCategory::SessionCreated, session_id, None);
    }

    async fn on_logon(&self, session_id: &SessionId) {
        self.dispatch(EventCategory::SessionLogon, session_id, None);
    }

    async fn on_logout(&self, session_id: &SessionId) {
        self.dispatch(EventCategory::SessionLogoff, session_id, None);
    }

    async fn to_admin(&self, message: &mut Message, session_id: &SessionId) {
        self.dispatch(EventCategory::AdminMessageSent, session_id, Some(&*message));
    }

    async fn from_admin(&self, message: &Message, session_id: &SessionId) -> Result<(), RejectReason> {
        self.dispatch(EventCategory::AdminMessageReceived, session_id, Some(message));
        Ok(())
    }

    async fn to_app(&self, message: &mut Message, session_id: &SessionId) {
        self.dispatch(EventCategory::AppMessageSent, session_id, Some(&*message));
    }

    async fn from_app(&self, message: &Message, session_id: &SessionId) -> Result<(), RejectReason> {
        self.dispatch(EventCategory::AppMessageReceived, session_id, Some(message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_core::message::MsgType;
    use parking_lot::Mutex;

    fn id() -> SessionId {
        SessionId::new("FIX.4.2", "TRADER", "MARKET")
    }

    fn recorder(dispatcher: &EventDispatcher) -> (ListenerId, Arc<Mutex<Vec<EventRecord>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener_id = dispatcher.add_event_listener(
            move |category: EventCategory, session: &SessionId, message: Option<&Message>| -> ListenerResult {
                sink.lock().push(EventRecord::new(category, session, message));
                Ok(())
            },
        );
        (listener_id, seen)
    }

    #[test]
    fn test_carries_message() {
        assert!(!EventCategory::SessionCreated.carries_message());
        assert!(!EventCategory::SessionLogoff.carries_message());
        assert!(EventCategory::AdminMessageSent.carries_message());
        assert!(EventCategory::AppMessageReceived.carries_message());
    }

    #[tokio::test]
    async fn test_callbacks_map_to_categories() {
        let dispatcher = EventDispatcher::new();
        let (_, seen) = recorder(&dispatcher);
        let mut logon = Message::new(MsgType::Logon);
        let email = Message::new(MsgType::Email);

        dispatcher.on_create(&id()).await;
        dispatcher.to_admin(&mut logon, &id()).await;
        dispatcher.from_admin(&logon, &id()).await.unwrap();
        dispatcher.on_logon(&id()).await;
        dispatcher.from_app(&email, &id()).await.unwrap();
        dispatcher.on_logout(&id()).await;

        let categories: Vec<_> = seen.lock().iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![
                EventCategory::SessionCreated,
                EventCategory::AdminMessageSent,
                EventCategory::AdminMessageReceived,
                EventCategory::SessionLogon,
                EventCategory::AppMessageReceived,
                EventCategory::SessionLogoff,
            ]
        );
        for record in seen.lock().iter() {
            assert_eq!(record.message.is_some(), record.category.carries_message());
        }
    }

    #[test]
    fn test_remove_stops_delivery() {
        let dispatcher = EventDispatcher::new();
        let (listener, seen) = recorder(&dispatcher);
        dispatcher.dispatch(EventCategory::SessionLogon, &id(), None);
        assert!(dispatcher.remove_event_listener(listener));
        assert!(!dispatcher.remove_event_listener(listener));
        dispatcher.dispatch(EventCategory::SessionLogoff, &id(), None);

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn test_late_listener_sees_only_new_events() {
        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(EventCategory::SessionCreated, &id(), None);
        let (_, seen) = recorder(&dispatcher);
        dispatcher.dispatch(EventCategory::SessionLogon, &id(), None);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].category, EventCategory::SessionLogon);
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_event_listener(
            |_: EventCategory, _: &SessionId, _: Option<&Message>| -> ListenerResult {
                Err("listener failure".into())
            },
        );
        dispatcher.add_event_listener(
            |_: EventCategory, _: &SessionId, _: Option<&Message>| -> ListenerResult {
                panic!("listener panic")
            },
        );
        let (_, seen) = recorder(&dispatcher);

        dispatcher.dispatch(EventCategory::SessionLogon, &id(), None);
        dispatcher.dispatch(EventCategory::SessionLogoff, &id(), None);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_reentrant_delivery() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = Arc::downgrade(&dispatcher);
        dispatcher.add_event_listener(
            move |category: EventCategory, session: &SessionId, _: Option<&Message>| -> ListenerResult {
                if category == EventCategory::SessionLogon {
                    if let Some(dispatcher) = inner.upgrade() {
                        dispatcher.dispatch(EventCategory::SessionLogoff, session, None);
                    }
                }
                Ok(())
            },
        );
        let (_, seen) = recorder(&dispatcher);

        dispatcher.dispatch(EventCategory::SessionLogon, &id(), None);
        let categories: Vec<_> = seen.lock().iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![EventCategory::SessionLogoff, EventCategory::SessionLogon]
        );
    }

    #[test]
    fn test_concurrent_dispatch_and_registration() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let (_, seen) = recorder(&dispatcher);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        dispatcher.dispatch(EventCategory::AppMessageSent, &id(), None);
                        let extra = dispatcher.add_event_listener(
                            |_: EventCategory, _: &SessionId, _: Option<&Message>| -> ListenerResult {
                                Ok(())
                            },
                        );
                        dispatcher.remove_event_listener(extra);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(seen.lock().len(), 200);
        assert_eq!(dispatcher.listener_count(), 1);
    }
}
