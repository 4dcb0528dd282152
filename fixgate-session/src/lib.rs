/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate session
//!
//! Session layer for the fixgate engine adapter.
//!
//! This crate provides:
//! - **Settings**: the declarative settings document and its key names
//! - **Application**: the callback surface a session drives
//! - **Session**: logon bracket, sequence checks and outbound numbering
//! - **Factory**: session construction from settings and shared components

pub mod application;
pub mod config;
pub mod error;
pub mod factory;
pub mod message_factory;
pub mod sequence;
pub mod session;
pub mod settings;
pub mod state;

pub use application::{Application, NoOpApplication, RejectReason};
pub use config::SessionConfig;
pub use error::FactoryError;
pub use factory::SessionFactory;
pub use message_factory::{DefaultMessageFactory, MessageFactory};
pub use sequence::SequenceResult;
pub use session::Session;
pub use settings::{SessionSettings, keys};
pub use state::SessionStatus;
