/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Identity and time types shared by every crate.

use arrayvec::ArrayString;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a session by BeginString and the two comp ids, plus the
/// optional sub ids.
///
/// Keys both the settings sections and a connector's session table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub sender_sub_id: Option<String>,
    pub target_sub_id: Option<String>,
}

impl SessionId {
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            sender_sub_id: None,
            target_sub_id: None,
        }
    }

    #[must_use]
    pub fn with_sender_sub_id(self, sub_id: impl Into<String>) -> Self {
        Self {
            sender_sub_id: Some(sub_id.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_target_sub_id(self, sub_id: impl Into<String>) -> Self {
        Self {
            target_sub_id: Some(sub_id.into()),
            ..self
        }
    }

    /// The same session seen from the counterparty: sender and target swap.
    ///
    /// An acceptor finds the session for an inbound Logon this way.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let Self {
            begin_string,
            sender_comp_id,
            target_comp_id,
            sender_sub_id,
            target_sub_id,
        } = self.clone();
        Self {
            begin_string,
            sender_comp_id: target_comp_id,
            target_comp_id: sender_comp_id,
            sender_sub_id: target_sub_id,
            target_sub_id: sender_sub_id,
        }
    }

    /// `BEGIN-SENDER-TARGET` with anything unsafe in a file name dropped.
    #[must_use]
    pub fn file_stem(&self) -> String {
        [&self.begin_string, &self.sender_comp_id, &self.target_comp_id]
            .iter()
            .map(|part| {
                part.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
    }
}

/// Which side opens the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConnectionRole {
    Initiator,
    Acceptor,
}

impl FromStr for ConnectionRole {
    type Err = String;

    /// Accepts `ConnectionType` values, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "initiator" => Ok(Self::Initiator),
            "acceptor" => Ok(Self::Acceptor),
            _ => Err(s.to_owned()),
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initiator => "Initiator",
            Self::Acceptor => "Acceptor",
        })
    }
}

/// UTC instant rendered as `YYYYMMDD-HH:MM:SS.sss`, the SendingTime (52)
/// layout also used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Out-of-range values clamp to the epoch.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        let dt = i64::try_from(millis)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_default();
        Self(dt)
    }

    #[must_use]
    pub fn as_millis(self) -> u64 {
        u64::try_from(self.0.timestamp_millis()).unwrap_or(0)
    }

    /// Renders without allocating.
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let mut out = ArrayString::new();
        // 21 bytes always fit the layout for four-digit years.
        let _ = fmt::write(&mut out, format_args!("{}", self.0.format("%Y%m%d-%H:%M:%S%.3f")));
        out
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_millis())
    }
}
