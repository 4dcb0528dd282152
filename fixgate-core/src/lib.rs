/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Core
//!
//! Core types, messages, and error definitions for the fixgate FIX engine adapter.
//!
//! This crate provides the fundamental building blocks used across all fixgate crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Message types**: `Message`, `MsgType` and well-known tags
//! - **Core types**: `SessionId`, `ConnectionRole`, `Timestamp`

pub mod error;
pub mod message;
pub mod types;

pub use error::{
    ConfigError, DecodeError, EncodeError, FixError, Result, SessionError, StoreError,
};
pub use message::{Message, MsgType, tags};
pub use types::{ConnectionRole, SessionId, Timestamp};
