/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Store
//!
//! Message persistence for fixgate sessions.
//!
//! This crate provides:
//! - **MessageStore trait**: Abstract interface for message storage
//! - **MessageStoreFactory trait**: Per-session store creation, tagged with a [`StoreKind`]
//! - **MemoryStore**: In-memory message store for testing and simple use cases
//! - **FileStore**: File-based persistent message store
//! - **SqlStore**: SQLite-backed store for database and embedded configurations

pub mod database;
pub mod file;
pub mod memory;
pub mod sql;
pub mod traits;

pub use file::{FileStore, FileStoreFactory};
pub use memory::{MemoryStore, MemoryStoreFactory};
pub use sql::{SqlStore, SqlStoreFactory};
pub use traits::{MessageStore, MessageStoreFactory, StoreKind};
