/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session status.

use std::fmt;

/// Where a session is in its logon bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No transport is attached.
    #[default]
    Disconnected,
    /// Transport attached, logon not yet completed.
    Connected,
    /// Logon sent by this side, awaiting the answer.
    LogonSent,
    /// Logon completed on both sides.
    LoggedOn,
    /// Logout sent by this side, awaiting confirmation.
    LogoutSent,
}

impl SessionStatus {
    /// Returns true if a transport is attached.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Returns true if the logon bracket is open.
    #[must_use]
    pub const fn is_logged_on(self) -> bool {
        matches!(self, Self::LoggedOn | Self::LogoutSent)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::LogonSent => "logon-sent",
            Self::LoggedOn => "logged-on",
            Self::LogoutSent => "logout-sent",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(!SessionStatus::Disconnected.is_connected());
        assert!(SessionStatus::LogonSent.is_connected());
        assert!(!SessionStatus::LogonSent.is_logged_on());
        assert!(SessionStatus::LogoutSent.is_logged_on());
        assert_eq!(SessionStatus::default().to_string(), "disconnected");
    }
}
