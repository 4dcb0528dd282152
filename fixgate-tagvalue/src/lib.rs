/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # fixgate Tag-Value
//!
//! FIX tag=value encoding and decoding for the fixgate session runtime.
//!
//! ## Features
//!
//! - **Framing**: BeginString, BodyLength and CheckSum handled automatically
//! - **Fast delimiter search**: Uses `memchr` while walking fields
//! - **Owned messages**: Decodes into [`Message`] for cross-task delivery

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use checksum::calculate_checksum;
pub use decoder::{Decoder, decode_message};
pub use encoder::{Encoder, encode_message};
pub use fixgate_core::message::Message;
