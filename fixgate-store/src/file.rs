/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! File-based message store.
//!
//! Each session owns three files under the store directory:
//! - `<session>.body`: appended records of `seq (u64 BE) | len (u32 BE) | bytes`
//! - `<session>.seqnums`: `sender:target`, rewritten on every change
//! - `<session>.session`: creation time in milliseconds since the epoch
//!
//! The body file is indexed into memory when the store is opened.

use crate::memory::collect_range;
use crate::traits::{MessageStore, MessageStoreFactory, StoreKind};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::types::SessionId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const RECORD_HEADER_LEN: usize = 12;

#[derive(Debug)]
struct FileState {
    messages: BTreeMap<u64, Bytes>,
    next_sender_seq: u64,
    next_target_seq: u64,
    creation_time: SystemTime,
    body: File,
}

/// Persistent store backed by flat files.
#[derive(Debug)]
pub struct FileStore {
    body_path: PathBuf,
    seqnums_path: PathBuf,
    session_path: PathBuf,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Opens (or creates) the store for `session_id` under `dir`.
    ///
    /// # Errors
    /// Returns `StoreError` if the directory or files cannot be accessed or
    /// an existing body file is truncated.
    pub fn open(dir: impl AsRef<Path>, session_id: &SessionId) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stem = session_id.file_stem();
        let body_path = dir.join(format!("{stem}.body"));
        let seqnums_path = dir.join(format!("{stem}.seqnums"));
        let session_path = dir.join(format!("{stem}.session"));

        let messages = load_body(&body_path)?;
        let (next_sender_seq, next_target_seq) = load_seqnums(&seqnums_path)?;
        let creation_time = load_creation_time(&session_path)?;
        let body = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&body_path)?;

        debug!(session = %session_id, path = %dir.display(), stored = messages.len(), "file store opened");

        Ok(Self {
            body_path,
            seqnums_path,
            session_path,
            state: Mutex::new(FileState {
                messages,
                next_sender_seq,
                next_target_seq,
                creation_time,
                body,
            }),
        })
    }

    fn write_seqnums(&self, sender: u64, target: u64) -> Result<(), StoreError> {
        fs::write(&self.seqnums_path, format!("{sender}:{target}"))?;
        Ok(())
    }
}

fn load_body(path: &Path) -> Result<BTreeMap<u64, Bytes>, StoreError> {
    let mut messages = BTreeMap::new();
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(messages),
        Err(e) => return Err(e.into()),
    };

    let mut offset = 0;
    while offset < raw.len() {
        let header = raw
            .get(offset..offset + RECORD_HEADER_LEN)
            .ok_or_else(|| truncated(path))?;
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&header[..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[8..]);
        let start = offset + RECORD_HEADER_LEN;
        let end = start + u32::from_be_bytes(len) as usize;
        let payload = raw.get(start..end).ok_or_else(|| truncated(path))?;
        messages.insert(u64::from_be_bytes(seq), Bytes::copy_from_slice(payload));
        offset = end;
    }
    Ok(messages)
}

fn truncated(path: &Path) -> StoreError {
    StoreError::Corrupted {
        reason: format!("truncated record in {}", path.display()),
    }
}

fn load_seqnums(path: &Path) -> Result<(u64, u64), StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((1, 1)),
        Err(e) => return Err(e.into()),
    };
    let corrupted = || StoreError::Corrupted {
        reason: format!("bad sequence file {}", path.display()),
    };
    let (sender, target) = raw.trim().split_once(':').ok_or_else(corrupted)?;
    Ok((
        sender.parse().map_err(|_| corrupted())?,
        target.parse().map_err(|_| corrupted())?,
    ))
}

fn load_creation_time(path: &Path) -> Result<SystemTime, StoreError> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let millis: u64 = raw.trim().parse().map_err(|_| StoreError::Corrupted {
                reason: format!("bad session file {}", path.display()),
            })?;
            Ok(UNIX_EPOCH + Duration::from_millis(millis))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let now = SystemTime::now();
            write_creation_time(path, now)?;
            Ok(now)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_creation_time(path: &Path, time: SystemTime) -> Result<(), StoreError> {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    fs::write(path, millis.to_string())?;
    Ok(())
}

#[async_trait]
impl MessageStore for FileStore {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        let len = u32::try_from(message.len()).map_err(|_| StoreError::StoreFailed {
            seq_num,
            reason: "message exceeds record size".to_string(),
        })?;
        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + message.len());
        record.extend_from_slice(&seq_num.to_be_bytes());
        record.extend_from_slice(&len.to_be_bytes());
        record.extend_from_slice(message);

        let mut state = self.state.lock();
        state
            .body
            .write_all(&record)
            .map_err(|e| StoreError::StoreFailed {
                seq_num,
                reason: e.to_string(),
            })?;
        state
            .messages
            .insert(seq_num, Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        collect_range(&self.state.lock().messages, begin, end)
    }

    fn next_sender_seq(&self) -> u64 {
        self.state.lock().next_sender_seq
    }

    fn next_target_seq(&self) -> u64 {
        self.state.lock().next_target_seq
    }

    fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.next_sender_seq = seq;
        self.write_seqnums(seq, state.next_target_seq)
    }

    fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.next_target_seq = seq;
        self.write_seqnums(state.next_sender_seq, seq)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.body = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.body_path)?;
        state.messages.clear();
        state.next_sender_seq = 1;
        state.next_target_seq = 1;
        state.creation_time = SystemTime::now();
        self.write_seqnums(1, 1)?;
        write_creation_time(&self.session_path, state.creation_time)
    }

    fn creation_time(&self) -> SystemTime {
        self.state.lock().creation_time
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let messages = load_body(&self.body_path)?;
        let (sender, target) = load_seqnums(&self.seqnums_path)?;
        let creation_time = load_creation_time(&self.session_path)?;
        let mut state = self.state.lock();
        state.messages = messages;
        state.next_sender_seq = sender;
        state.next_target_seq = target;
        state.creation_time = creation_time;
        Ok(())
    }
}

/// Factory for [`FileStore`], configured by `FileStorePath`.
#[derive(Debug, Clone)]
pub struct FileStoreFactory {
    path: PathBuf,
}

impl FileStoreFactory {
    /// Creates a factory writing under `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageStoreFactory for FileStoreFactory {
    fn kind(&self) -> StoreKind {
        StoreKind::File
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn MessageStore>, StoreError> {
        Ok(Arc::new(FileStore::open(&self.path, session_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::new("FIX.4.2", "TRADER", "MARKET")
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), &session()).unwrap();
            store.store(1, b"first").await.unwrap();
            store.store(2, b"second").await.unwrap();
            store.set_next_sender_seq(3).unwrap();
            store.set_next_target_seq(9).unwrap();
        }

        let store = FileStore::open(dir.path(), &session()).unwrap();
        assert_eq!(store.next_sender_seq(), 3);
        assert_eq!(store.next_target_seq(), 9);
        let messages = store.get_range(1, 2).await.unwrap();
        assert_eq!(messages, vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]);
    }

    #[tokio::test]
    async fn test_file_store_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), &session()).unwrap();
        store.store(1, b"first").await.unwrap();
        store.set_next_sender_seq(2).unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.next_sender_seq(), 1);
        assert!(store.get_range(1, 0).await.is_err());

        let reopened = FileStore::open(dir.path(), &session()).unwrap();
        assert!(reopened.get_range(1, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_refresh_reads_other_writer() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FileStore::open(dir.path(), &session()).unwrap();
        let writer = FileStore::open(dir.path(), &session()).unwrap();
        writer.store(1, b"first").await.unwrap();
        writer.set_next_sender_seq(2).unwrap();

        assert_eq!(reader.next_sender_seq(), 1);
        reader.refresh().await.unwrap();
        assert_eq!(reader.next_sender_seq(), 2);
        assert_eq!(
            reader.get_range(1, 1).await.unwrap(),
            vec![Bytes::from_static(b"first")]
        );
    }

    #[test]
    fn test_file_store_detects_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let stem = session().file_stem();
        fs::write(dir.path().join(format!("{stem}.body")), [0u8, 0, 0]).unwrap();

        assert!(matches!(
            FileStore::open(dir.path(), &session()),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_file_factory_kind_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FileStoreFactory::new(dir.path().join("store"));
        assert_eq!(factory.kind(), StoreKind::File);

        factory.create(&session()).unwrap();
        let stem = session().file_stem();
        assert!(dir.path().join("store").join(format!("{stem}.body")).exists());
        assert!(dir.path().join("store").join(format!("{stem}.session")).exists());
    }
}
