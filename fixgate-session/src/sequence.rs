/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Inbound MsgSeqNum (34) checks.

use std::cmp::Ordering;

/// How a received MsgSeqNum relates to the one the store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceResult {
    Ok,
    /// Already seen. Fatal unless the message is a possible duplicate.
    TooLow { expected: u64, received: u64 },
    /// Messages were skipped. Accepted and logged; there is no resend.
    Gap { expected: u64, received: u64 },
}

impl SequenceResult {
    #[must_use]
    pub fn check(expected: u64, received: u64) -> Self {
        match received.cmp(&expected) {
            Ordering::Equal => Self::Ok,
            Ordering::Less => Self::TooLow { expected, received },
            Ordering::Greater => Self::Gap { expected, received },
        }
    }
}
