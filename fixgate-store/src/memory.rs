/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Volatile store used when no persistent store is configured.

use crate::traits::{MessageStore, MessageStoreFactory, StoreKind};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::types::SessionId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug)]
struct Ledger {
    sent: BTreeMap<u64, Bytes>,
    next_sender_seq: u64,
    next_target_seq: u64,
    created: SystemTime,
}

impl Ledger {
    fn fresh() -> Self {
        Self {
            sent: BTreeMap::new(),
            next_sender_seq: 1,
            next_target_seq: 1,
            created: SystemTime::now(),
        }
    }
}

/// Keeps sent messages and sequence numbers for the life of the process.
#[derive(Debug)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::fresh()),
        }
    }

    /// Number of sent messages held.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.ledger.lock().sent.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects `begin..=end` from an ordered message map; `end == 0` means
/// "through the last message".
pub(crate) fn collect_range(
    messages: &BTreeMap<u64, Bytes>,
    begin: u64,
    end: u64,
) -> Result<Vec<Bytes>, StoreError> {
    let last = if end == 0 { u64::MAX } else { end };
    if begin > last {
        return Ok(Vec::new());
    }
    let found: Vec<Bytes> = messages.range(begin..=last).map(|(_, m)| m.clone()).collect();
    if found.is_empty() {
        return Err(StoreError::RangeNotAvailable {
            range: begin..last.saturating_add(1),
        });
    }
    Ok(found)
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        self.ledger
            .lock()
            .sent
            .insert(seq_num, Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        collect_range(&self.ledger.lock().sent, begin, end)
    }

    fn next_sender_seq(&self) -> u64 {
        self.ledger.lock().next_sender_seq
    }

    fn next_target_seq(&self) -> u64 {
        self.ledger.lock().next_target_seq
    }

    fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.ledger.lock().next_sender_seq = seq;
        Ok(())
    }

    fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.ledger.lock().next_target_seq = seq;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        *self.ledger.lock() = Ledger::fresh();
        Ok(())
    }

    fn creation_time(&self) -> SystemTime {
        self.ledger.lock().created
    }
}

/// Hands every session its own [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStoreFactory;

impl MessageStoreFactory for MemoryStoreFactory {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn create(&self, _session_id: &SessionId) -> Result<Arc<dyn MessageStore>, StoreError> {
        Ok(Arc::new(MemoryStore::new()))
    }
}
