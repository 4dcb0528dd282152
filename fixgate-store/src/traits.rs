/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Message store and store factory traits.
//!
//! A [`MessageStoreFactory`] is resolved once per engine and asked for one
//! [`MessageStore`] per session.

use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::types::SessionId;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Outbound message journal plus the session's two sequence numbers.
///
/// Sequence accessors are synchronous; implementations keep them cached
/// and write through on every change.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Records an outbound frame under `seq_num`.
    ///
    /// # Errors
    /// `StoreError::StoreFailed` or an I/O error from the backing storage.
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError>;

    /// Frames stored in `begin..=end`, in sequence order. An `end` of 0
    /// reads to the last stored frame; `begin > end` yields nothing.
    ///
    /// # Errors
    /// `StoreError::RangeNotAvailable` when no frame falls in the range.
    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError>;

    fn next_sender_seq(&self) -> u64;

    fn next_target_seq(&self) -> u64;

    /// # Errors
    /// The new value could not be persisted.
    fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// # Errors
    /// The new value could not be persisted.
    fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Drops every frame, sets both sequence numbers to 1 and restamps the
    /// creation time.
    ///
    /// # Errors
    /// The backing storage could not be cleared.
    async fn reset(&self) -> Result<(), StoreError>;

    fn creation_time(&self) -> SystemTime;

    /// Reloads cached state from the backing storage. Volatile stores have
    /// nothing to reload.
    ///
    /// # Errors
    /// The backing storage could not be read.
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// The family a store factory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Memory,
    /// `.body`, `.seqnums` and `.session` files per session.
    File,
    /// Reached through `DatabaseDriver` and `DatabaseUrl`.
    Database,
    /// One SQLite file under a local directory.
    EmbeddedDatabase,
    Custom,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Database => "database",
            Self::EmbeddedDatabase => "embedded-database",
            Self::Custom => "custom",
        })
    }
}

/// Hands out one [`MessageStore`] per session.
pub trait MessageStoreFactory: Send + Sync + fmt::Debug {
    /// Factories supplied by callers report [`StoreKind::Custom`].
    fn kind(&self) -> StoreKind {
        StoreKind::Custom
    }

    /// # Errors
    /// The backing storage for `session_id` could not be opened.
    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn MessageStore>, StoreError>;
}
