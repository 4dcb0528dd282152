/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Transport
//!
//! Transport layer for the fixgate FIX engine adapter.
//!
//! This crate provides:
//! - **TCP transport**: Listener and connector for socket sessions
//! - **In-process pipes**: Port-addressed pipes for sessions inside one process
//! - **Codec**: Tokio codec for FIX message framing

pub mod codec;
pub mod connection;
pub mod error;
pub mod listener;
pub mod pipe;
pub mod protocol;
pub mod tcp;
pub mod transport;

pub use codec::{CodecError, FixCodec};
pub use connection::{Connection, FrameReceiver, FrameSender};
pub use error::TransportError;
pub use listener::Listener;
pub use pipe::PipeHub;
pub use protocol::{Endpoint, TransportProtocol};
pub use transport::Transport;
