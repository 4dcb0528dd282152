/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate
//!
//! A FIX engine adapter for Rust.
//!
//! fixgate reads a settings document, picks the message store, log and
//! message factory the sessions run with, builds an initiator and an
//! acceptor for the sessions of each role, and publishes every session
//! event to registered listeners.
//!
//! ## Features
//!
//! - **Component inference**: Store and log kinds follow from the settings
//!   keys present, and conflicting keys are rejected
//! - **Connectors**: Socket and in-process transports, single threaded or
//!   with one processing task per session
//! - **Events**: Logon, logoff and message traffic as a typed event stream
//! - **Management**: Optional per-engine registry of running connectors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixgate::prelude::*;
//!
//! let engine = EngineBuilder::new("fix:trader", "trader.toml")
//!     .with_resource_root("config")
//!     .build()
//!     .await?;
//! engine.add_event_listener(
//!     |category: EventCategory, id: &SessionId, _message: Option<&Message>| -> ListenerResult {
//!         println!("{category} {id}");
//!         Ok(())
//!     },
//! );
//! engine.start().await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Session identifiers, messages and error definitions
//! - [`tagvalue`]: Tag=value encoding and decoding
//! - [`transport`]: Socket and in-process transports
//! - [`store`]: Message stores
//! - [`log`]: Session logs
//! - [`session`]: Settings, application callbacks and the session runtime
//! - [`engine`]: Component resolution, connectors and events

pub mod core {
    //! Session identifiers, messages and error definitions.
    pub use fixgate_core::*;
}

pub mod tagvalue {
    //! Tag=value encoding and decoding.
    pub use fixgate_tagvalue::*;
}

pub mod transport {
    //! Socket and in-process transports.
    pub use fixgate_transport::*;
}

pub mod store {
    //! Message stores.
    pub use fixgate_store::*;
}

pub mod log {
    //! Session logs.
    pub use fixgate_log::*;
}

pub mod session {
    //! Settings, application callbacks and the session runtime.
    pub use fixgate_session::*;
}

pub mod engine {
    //! Component resolution, connectors and events.
    pub use fixgate_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fixgate_core::{
        ConfigError, ConnectionRole, FixError, Message, MsgType, SessionError, SessionId, tags,
    };

    // Settings
    pub use fixgate_session::{SessionSettings, keys};

    // Components
    pub use fixgate_log::{LogFactory, LogKind};
    pub use fixgate_session::{DefaultMessageFactory, MessageFactory};
    pub use fixgate_store::{MessageStoreFactory, StoreKind};

    // Transport
    pub use fixgate_transport::PipeHub;

    // Engine
    pub use fixgate_engine::{
        Engine, EngineBuilder, EngineError, EventCategory, EventListener, EventRecord,
        ListenerId, ListenerResult, ThreadModel,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        assert_eq!(id.reversed().sender_comp_id, "MARKET");
        assert_eq!(ThreadModel::default(), ThreadModel::SingleThreaded);
        assert!(EventCategory::AppMessageSent.carries_message());
    }

    #[tokio::test]
    async fn test_build_from_prelude() {
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        let mut settings = SessionSettings::new();
        settings.add_session(id.clone());
        settings.set(&id, keys::CONNECTION_TYPE, "initiator");

        let engine = EngineBuilder::new("fix:prelude", "unused.toml")
            .with_settings(settings)
            .build()
            .await
            .unwrap();
        assert!(engine.initiator().is_some());
        assert_eq!(engine.components().store_kind(), StoreKind::Memory);
    }
}
