/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Transport error types.

use thiserror::Error;

/// Errors raised while binding, connecting or writing.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The requested in-process port already has a listener.
    #[error("pipe port {0} is already bound")]
    AddressInUse(u16),

    /// No in-process listener is bound on the requested port.
    #[error("no pipe listener on port {0}")]
    ConnectionRefused(u16),

    /// The connection has been closed.
    #[error("connection to {0} is closed")]
    Closed(String),

    /// The protocol name is not recognised.
    #[error("unknown transport protocol: {0}")]
    UnknownProtocol(String),

    /// Socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
