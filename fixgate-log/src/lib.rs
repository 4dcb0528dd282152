/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Log
//!
//! Session message and event logs.
//!
//! This crate provides:
//! - **Log / LogFactory traits**: per-session sinks tagged with a [`LogKind`]
//! - **ScreenLog**: standard output, filtered by direction
//! - **FileLog**: per-session message and event files
//! - **StructuredLog**: records emitted through `tracing`
//! - **SqlLog**: rows in the database shared with the SQL message store

pub mod file;
pub mod screen;
pub mod sql;
pub mod structured;
pub mod traits;

pub use file::{FileLog, FileLogFactory};
pub use screen::{ScreenLog, ScreenLogFactory, ScreenLogOptions};
pub use sql::{SqlLog, SqlLogFactory};
pub use structured::{StructuredLog, StructuredLogFactory};
pub use traits::{Log, LogError, LogFactory, LogKind, printable};
