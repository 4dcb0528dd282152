/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Engine error type.

use fixgate_core::error::{ConfigError, SessionError, StoreError};
use fixgate_log::LogError;
use fixgate_session::FactoryError;
use fixgate_transport::TransportError;
use thiserror::Error;

/// Errors raised by engine construction and lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Ambiguous, missing or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A session could not be created.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// A message store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session log could not be opened.
    #[error(transparent)]
    Log(#[from] LogError),

    /// A listener could not be bound or a peer could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
