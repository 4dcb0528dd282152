/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Message construction strategy.

use fixgate_core::message::{Message, MsgType};
use std::fmt;

/// Builds empty messages for a session's FIX version.
pub trait MessageFactory: Send + Sync + fmt::Debug {
    /// Creates an empty message of `msg_type` for `begin_string`.
    fn create(&self, begin_string: &str, msg_type: MsgType) -> Message;
}

/// Version-independent factory used unless another one is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessageFactory;

impl MessageFactory for DefaultMessageFactory {
    fn create(&self, _begin_string: &str, msg_type: MsgType) -> Message {
        Message::new(msg_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory() {
        let message = DefaultMessageFactory.create("FIX.4.2", MsgType::Logon);
        assert_eq!(message.msg_type(), &MsgType::Logon);
        assert_eq!(message.field_count(), 0);
    }
}
