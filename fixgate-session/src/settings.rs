/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session settings store.
//!
//! Settings are a default section plus an ordered list of session sections.
//! Every value is kept as a string; typed accessors look in the session
//! section first and fall back to the defaults.
//!
//! The on-disk form is TOML:
//!
//! ```toml
//! [default]
//! SocketAcceptProtocol = "VM_PIPE"
//!
//! [[session]]
//! BeginString = "FIX.4.2"
//! SenderCompID = "MARKET"
//! TargetCompID = "TRADER"
//! ConnectionType = "acceptor"
//! SocketAcceptPort = 5001
//! ```

use fixgate_core::error::ConfigError;
use fixgate_core::types::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Recognised setting keys.
pub mod keys {
    /// FIX version of a session.
    pub const BEGIN_STRING: &str = "BeginString";
    /// Local comp id of a session.
    pub const SENDER_COMP_ID: &str = "SenderCompID";
    /// Remote comp id of a session.
    pub const TARGET_COMP_ID: &str = "TargetCompID";
    /// Optional local sub id.
    pub const SENDER_SUB_ID: &str = "SenderSubID";
    /// Optional remote sub id.
    pub const TARGET_SUB_ID: &str = "TargetSubID";
    /// `initiator` or `acceptor`.
    pub const CONNECTION_TYPE: &str = "ConnectionType";
    /// `SingleThreaded` or `ThreadPerSession`.
    pub const THREAD_MODEL: &str = "ThreadModel";
    /// Register connectors in the management registry.
    pub const USE_MANAGEMENT: &str = "UseManagement";
    /// Validate messages against a data dictionary.
    pub const USE_DATA_DICTIONARY: &str = "UseDataDictionary";
    /// Transport used by acceptor sessions.
    pub const SOCKET_ACCEPT_PROTOCOL: &str = "SocketAcceptProtocol";
    /// Transport used by initiator sessions.
    pub const SOCKET_CONNECT_PROTOCOL: &str = "SocketConnectProtocol";
    /// Listening port of an acceptor session.
    pub const SOCKET_ACCEPT_PORT: &str = "SocketAcceptPort";
    /// Listening address of an acceptor session.
    pub const SOCKET_ACCEPT_ADDRESS: &str = "SocketAcceptAddress";
    /// Remote port of an initiator session.
    pub const SOCKET_CONNECT_PORT: &str = "SocketConnectPort";
    /// Remote host of an initiator session.
    pub const SOCKET_CONNECT_HOST: &str = "SocketConnectHost";
    /// Heartbeat interval in seconds.
    pub const HEART_BT_INT: &str = "HeartBtInt";
    /// Seconds between initiator connection attempts.
    pub const RECONNECT_INTERVAL: &str = "ReconnectInterval";
    /// Reset sequence numbers when logging on.
    pub const RESET_ON_LOGON: &str = "ResetOnLogon";
    /// Directory of the file message store.
    pub const FILE_STORE_PATH: &str = "FileStorePath";
    /// Database driver name.
    pub const DATABASE_DRIVER: &str = "DatabaseDriver";
    /// Database connection URL.
    pub const DATABASE_URL: &str = "DatabaseUrl";
    /// Directory of the embedded database.
    pub const EMBEDDED_DATABASE_DIR: &str = "EmbeddedDatabaseDir";
    /// Directory of the file log.
    pub const FILE_LOG_PATH: &str = "FileLogPath";
    /// Category of the structured log.
    pub const LOG_EVENT_CATEGORY: &str = "LogEventCategory";
    /// Print session events on the screen log.
    pub const SCREEN_LOG_EVENTS: &str = "ScreenLogEvents";
    /// Print inbound frames on the screen log.
    pub const SCREEN_LOG_SHOW_INCOMING: &str = "ScreenLogShowIncoming";
    /// Print outbound frames on the screen log.
    pub const SCREEN_LOG_SHOW_OUTGOING: &str = "ScreenLogShowOutgoing";
}

type Section = BTreeMap<String, String>;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    default: BTreeMap<String, toml::Value>,
    #[serde(default)]
    session: Vec<BTreeMap<String, toml::Value>>,
}

/// Default section plus one section per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    defaults: Section,
    sessions: Vec<(SessionId, Section)>,
}

impl SessionSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML settings document.
    ///
    /// # Errors
    /// Returns `ConfigError::Malformed` if the document is not valid TOML or
    /// holds unsupported values, and `ConfigError::MissingSetting` if a
    /// session section lacks its identity keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let document: Document =
            toml::from_str(source).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let mut settings = Self {
            defaults: stringify_section(document.default)?,
            sessions: Vec::with_capacity(document.session.len()),
        };
        for raw in document.session {
            let section = stringify_section(raw)?;
            let id = settings.identity_of(&section)?;
            if settings.sessions.iter().any(|(existing, _)| *existing == id) {
                return Err(ConfigError::Malformed(format!("duplicate session {id}")));
            }
            settings.sessions.push((id, section));
        }
        Ok(settings)
    }

    /// Reads and parses a TOML settings file.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidArgument` if the file cannot be read, or
    /// any error of [`SessionSettings::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Writes the settings back as a TOML document.
    ///
    /// # Errors
    /// Returns `ConfigError::Malformed` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let to_values = |section: &Section| {
            section
                .iter()
                .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
                .collect::<BTreeMap<_, _>>()
        };
        let document = Document {
            default: to_values(&self.defaults),
            session: self.sessions.iter().map(|(_, s)| to_values(s)).collect(),
        };
        toml::to_string(&document).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    fn identity_of(&self, section: &Section) -> Result<SessionId, ConfigError> {
        let lookup = |key: &str| {
            section
                .get(key)
                .or_else(|| self.defaults.get(key))
                .cloned()
                .ok_or_else(|| ConfigError::MissingSetting {
                    key: key.to_string(),
                    session: None,
                })
        };
        let mut id = SessionId::new(
            lookup(keys::BEGIN_STRING)?,
            lookup(keys::SENDER_COMP_ID)?,
            lookup(keys::TARGET_COMP_ID)?,
        );
        id.sender_sub_id = lookup(keys::SENDER_SUB_ID).ok();
        id.target_sub_id = lookup(keys::TARGET_SUB_ID).ok();
        Ok(id)
    }

    /// Sets a value in the default section.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.defaults.insert(key.into(), value.into());
    }

    /// Adds a session section, or returns the existing one.
    ///
    /// The identity keys are written into the section.
    pub fn add_session(&mut self, id: SessionId) -> &mut BTreeMap<String, String> {
        let index = match self.sessions.iter().position(|(s, _)| *s == id) {
            Some(index) => index,
            None => {
                let mut section = Section::new();
                section.insert(keys::BEGIN_STRING.into(), id.begin_string.clone());
                section.insert(keys::SENDER_COMP_ID.into(), id.sender_comp_id.clone());
                section.insert(keys::TARGET_COMP_ID.into(), id.target_comp_id.clone());
                if let Some(sub) = &id.sender_sub_id {
                    section.insert(keys::SENDER_SUB_ID.into(), sub.clone());
                }
                if let Some(sub) = &id.target_sub_id {
                    section.insert(keys::TARGET_SUB_ID.into(), sub.clone());
                }
                self.sessions.push((id, section));
                self.sessions.len() - 1
            }
        };
        &mut self.sessions[index].1
    }

    /// Sets a value in a session section, creating the section if needed.
    pub fn set(&mut self, id: &SessionId, key: impl Into<String>, value: impl Into<String>) {
        self.add_session(id.clone()).insert(key.into(), value.into());
    }

    /// Returns the session identifiers in document order.
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.iter().map(|(id, _)| id)
    }

    /// Returns the number of session sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if there are no session sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the default section.
    #[must_use]
    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    fn section(&self, id: &SessionId) -> Option<&Section> {
        self.sessions
            .iter()
            .find(|(s, _)| s == id)
            .map(|(_, section)| section)
    }

    /// Returns the raw value of `key` for `id`, falling back to the
    /// defaults. With `id = None` only the defaults are consulted.
    #[must_use]
    pub fn get(&self, id: Option<&SessionId>, key: &str) -> Option<&str> {
        id.and_then(|id| self.section(id))
            .and_then(|section| section.get(key))
            .or_else(|| self.defaults.get(key))
            .map(String::as_str)
    }

    /// Returns true if `key` is visible for `id`.
    #[must_use]
    pub fn contains(&self, id: Option<&SessionId>, key: &str) -> bool {
        self.get(id, key).is_some()
    }

    /// Returns true if `key` appears in the defaults or in any session.
    #[must_use]
    pub fn is_set_anywhere(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
            || self
                .sessions
                .iter()
                .any(|(_, section)| section.contains_key(key))
    }

    /// Returns the first value of `key`, looking at the defaults and then at
    /// each session in document order.
    #[must_use]
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.defaults
            .get(key)
            .or_else(|| self.sessions.iter().find_map(|(_, s)| s.get(key)))
            .map(String::as_str)
    }

    /// Returns the first boolean value of `key` in document order, or
    /// `default` when the key is not set anywhere.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` if the value is not a boolean.
    pub fn first_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.first_value(key) {
            Some(raw) => parse_bool(raw).ok_or_else(|| invalid(None, key, raw)),
            None => Ok(default),
        }
    }

    /// Returns a required string value.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` if the key is absent.
    pub fn get_string(&self, id: Option<&SessionId>, key: &str) -> Result<String, ConfigError> {
        self.get(id, key)
            .map(str::to_string)
            .ok_or_else(|| missing(id, key))
    }

    /// Returns a required boolean value (`Y`/`N`, `true`/`false`).
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` or `ConfigError::InvalidSetting`.
    pub fn get_bool(&self, id: Option<&SessionId>, key: &str) -> Result<bool, ConfigError> {
        let raw = self.get(id, key).ok_or_else(|| missing(id, key))?;
        parse_bool(raw).ok_or_else(|| invalid(id, key, raw))
    }

    /// Returns a boolean value, or `default` when absent.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` if the value is not a boolean.
    pub fn get_bool_or(
        &self,
        id: Option<&SessionId>,
        key: &str,
        default: bool,
    ) -> Result<bool, ConfigError> {
        match self.get(id, key) {
            Some(raw) => parse_bool(raw).ok_or_else(|| invalid(id, key, raw)),
            None => Ok(default),
        }
    }

    /// Returns a required integer value.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` or `ConfigError::InvalidSetting`.
    pub fn get_long(&self, id: Option<&SessionId>, key: &str) -> Result<i64, ConfigError> {
        let raw = self.get(id, key).ok_or_else(|| missing(id, key))?;
        raw.trim().parse().map_err(|_| invalid(id, key, raw))
    }

    /// Returns a required port-sized integer value.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` or `ConfigError::InvalidSetting`.
    pub fn get_u16(&self, id: Option<&SessionId>, key: &str) -> Result<u16, ConfigError> {
        let raw = self.get(id, key).ok_or_else(|| missing(id, key))?;
        raw.trim().parse().map_err(|_| invalid(id, key, raw))
    }
}

fn missing(id: Option<&SessionId>, key: &str) -> ConfigError {
    ConfigError::MissingSetting {
        key: key.to_string(),
        session: id.map(ToString::to_string),
    }
}

fn invalid(id: Option<&SessionId>, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        session: id.map(ToString::to_string),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "Y" | "y" | "true" | "TRUE" | "True" => Some(true),
        "N" | "n" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn stringify_section(raw: BTreeMap<String, toml::Value>) -> Result<Section, ConfigError> {
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => String::from(if b { "Y" } else { "N" }),
                other => {
                    return Err(ConfigError::Malformed(format!(
                        "unsupported value for {key}: {other}"
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
        [default]
        SocketAcceptProtocol = "VM_PIPE"
        UseManagement = false
        HeartBtInt = 30

        [[session]]
        BeginString = "FIX.4.2"
        SenderCompID = "MARKET"
        TargetCompID = "TRADER"
        ConnectionType = "acceptor"
        SocketAcceptPort = 5001

        [[session]]
        BeginString = "FIX.4.2"
        SenderCompID = "TRADER"
        TargetCompID = "MARKET"
        ConnectionType = "initiator"
        HeartBtInt = 15
    "#;

    fn acceptor() -> SessionId {
        SessionId::new("FIX.4.2", "MARKET", "TRADER")
    }

    #[test]
    fn test_parse_sessions_in_order() {
        let settings = SessionSettings::from_toml_str(DOCUMENT).unwrap();
        let ids: Vec<_> = settings.session_ids().cloned().collect();
        assert_eq!(ids, vec![acceptor(), acceptor().reversed()]);
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_typed_getters_and_fallback() {
        let settings = SessionSettings::from_toml_str(DOCUMENT).unwrap();
        let initiator = acceptor().reversed();

        assert_eq!(settings.get_u16(Some(&acceptor()), "SocketAcceptPort").unwrap(), 5001);
        assert_eq!(settings.get_long(Some(&acceptor()), "HeartBtInt").unwrap(), 30);
        assert_eq!(settings.get_long(Some(&initiator), "HeartBtInt").unwrap(), 15);
        assert!(!settings.get_bool(None, "UseManagement").unwrap());
        assert!(settings.get_bool_or(None, "ResetOnLogon", true).unwrap());
        assert_eq!(
            settings.get_string(Some(&initiator), "SocketAcceptProtocol").unwrap(),
            "VM_PIPE"
        );
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let settings = SessionSettings::from_toml_str(DOCUMENT).unwrap();
        let initiator = acceptor().reversed();

        let err = settings
            .get_u16(Some(&initiator), "SocketConnectPort")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { ref key, .. } if key == "SocketConnectPort"));

        let err = settings
            .get_bool(Some(&initiator), "ConnectionType")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn test_session_requires_identity() {
        let err = SessionSettings::from_toml_str("[[session]]\nBeginString = \"FIX.4.2\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { .. }));

        assert!(matches!(
            SessionSettings::from_toml_str("[bogus]\nkey = 1\n"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_anywhere_lookup() {
        let mut settings = SessionSettings::from_toml_str(DOCUMENT).unwrap();
        assert!(!settings.is_set_anywhere("FileStorePath"));

        settings.set(&acceptor(), "FileStorePath", "/tmp/store");
        assert!(settings.is_set_anywhere("FileStorePath"));
        assert!(!settings.contains(None, "FileStorePath"));
        assert_eq!(settings.first_value("FileStorePath"), Some("/tmp/store"));
    }

    #[test]
    fn test_to_toml_reparses() {
        let mut settings = SessionSettings::new();
        settings.set_default("ThreadModel", "ThreadPerSession");
        settings.set(&acceptor(), "ConnectionType", "acceptor");

        let text = settings.to_toml().unwrap();
        let reparsed = SessionSettings::from_toml_str(&text).unwrap();
        assert_eq!(reparsed, settings);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionSettings::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_first_bool() {
        let mut settings = SessionSettings::new();
        settings.set(&acceptor(), "ScreenLogShowIncoming", "N");
        assert!(!settings.first_bool("ScreenLogShowIncoming", true).unwrap());
        assert!(settings.first_bool("ScreenLogEvents", true).unwrap());

        settings.set_default("ScreenLogEvents", "maybe");
        assert!(matches!(
            settings.first_bool("ScreenLogEvents", true),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, DOCUMENT).unwrap();

        let settings = SessionSettings::load(&path).unwrap();
        assert_eq!(settings.len(), SessionSettings::from_toml_str(DOCUMENT).unwrap().len());
        assert_eq!(settings.get(None, "SocketAcceptProtocol"), Some("VM_PIPE"));
    }
}
