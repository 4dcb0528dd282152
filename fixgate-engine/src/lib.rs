/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Engine
//!
//! Turns a settings document into a running FIX engine.
//!
//! This crate provides:
//! - **Component resolution**: Picks the message store, log and message
//!   factory, rejecting settings that imply more than one of a kind
//! - **Connectors**: One initiator and one acceptor at most, single threaded
//!   or with a processing task per session
//! - **Event dispatcher**: Fans session events out to registered listeners
//! - **Management registry**: Per-engine registry of running connectors
//! - **Builder API**: Fluent configuration for engine setup

pub mod builder;
pub mod connector;
pub mod engine;
pub mod error;
pub mod events;
pub mod management;
pub mod resolver;
pub mod resource;

pub use builder::EngineBuilder;
pub use connector::{Acceptor, Initiator, ThreadModel};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use events::{EventCategory, EventDispatcher, EventListener, EventRecord, ListenerId, ListenerResult};
pub use management::{ConnectorSnapshot, Managed, ManagementError, ManagementRegistry, ObjectName, ObjectPattern};
pub use resolver::{ExplicitComponents, ResolvedComponents, resolve};
