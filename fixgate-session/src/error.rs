/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Errors raised while building sessions.

use fixgate_core::error::{ConfigError, StoreError};
use fixgate_log::LogError;
use thiserror::Error;

/// Failure to create a session from settings.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The session settings are incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The message store could not be opened.
    #[error("cannot open message store: {0}")]
    Store(#[from] StoreError),

    /// The session log could not be opened.
    #[error("cannot open session log: {0}")]
    Log(#[from] LogError),
}
