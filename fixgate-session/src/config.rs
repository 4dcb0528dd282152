/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session configuration.
//!
//! The typed per-session knobs the runtime needs, read from
//! [`SessionSettings`].

use crate::settings::{SessionSettings, keys};
use fixgate_core::error::ConfigError;
use fixgate_core::types::{ConnectionRole, SessionId};
use std::time::Duration;

/// Shortest wait between initiator connection attempts.
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Whether the session initiates or accepts.
    pub role: ConnectionRole,
    /// Heartbeat interval announced in Logon.
    pub heartbeat_interval: Duration,
    /// Seconds between initiator connection attempts.
    pub reconnect_interval: Duration,
    /// Whether to reset sequence numbers on logon.
    pub reset_on_logon: bool,
    /// Whether messages are validated against a data dictionary.
    pub use_data_dictionary: bool,
}

impl SessionConfig {
    /// Creates a configuration with default intervals.
    #[must_use]
    pub fn new(role: ConnectionRole) -> Self {
        Self {
            role,
            heartbeat_interval: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(30),
            reset_on_logon: false,
            use_data_dictionary: false,
        }
    }

    /// Reads the configuration of `id` from `settings`.
    ///
    /// # Errors
    /// Returns `ConfigError` if `ConnectionType` is missing or invalid, or
    /// a numeric or boolean setting cannot be parsed.
    pub fn from_settings(settings: &SessionSettings, id: &SessionId) -> Result<Self, ConfigError> {
        let raw_role = settings.get_string(Some(id), keys::CONNECTION_TYPE)?;
        let role = raw_role
            .parse::<ConnectionRole>()
            .map_err(|value| ConfigError::InvalidSetting {
                key: keys::CONNECTION_TYPE.to_string(),
                value,
                session: Some(id.to_string()),
            })?;

        let mut config = Self::new(role);
        if let Some(secs) = seconds(settings, id, keys::HEART_BT_INT)? {
            config.heartbeat_interval = secs;
        }
        if let Some(secs) = seconds(settings, id, keys::RECONNECT_INTERVAL)? {
            if secs < MIN_RECONNECT_INTERVAL {
                return Err(ConfigError::InvalidSetting {
                    key: keys::RECONNECT_INTERVAL.to_string(),
                    value: secs.as_secs().to_string(),
                    session: Some(id.to_string()),
                });
            }
            config.reconnect_interval = secs;
        }
        config.reset_on_logon = settings.get_bool_or(Some(id), keys::RESET_ON_LOGON, false)?;
        config.use_data_dictionary =
            settings.get_bool_or(Some(id), keys::USE_DATA_DICTIONARY, false)?;
        Ok(config)
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the reconnect interval, raised to [`MIN_RECONNECT_INTERVAL`]
    /// if shorter.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval.max(MIN_RECONNECT_INTERVAL);
        self
    }

    /// Sets whether to reset sequence numbers on logon.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }
}

fn seconds(
    settings: &SessionSettings,
    id: &SessionId,
    key: &str,
) -> Result<Option<Duration>, ConfigError> {
    if !settings.contains(Some(id), key) {
        return Ok(None);
    }
    let value = settings.get_long(Some(id), key)?;
    let secs = u64::try_from(value).map_err(|_| ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        session: Some(id.to_string()),
    })?;
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(role: &str) -> (SessionSettings, SessionId) {
        let id = SessionId::new("FIX.4.4", "SENDER", "TARGET");
        let mut settings = SessionSettings::new();
        settings.set(&id, keys::CONNECTION_TYPE, role);
        (settings, id)
    }

    #[test]
    fn test_session_config_defaults() {
        let (settings, id) = settings_with("initiator");
        let config = SessionConfig::from_settings(&settings, &id).unwrap();
        assert_eq!(config.role, ConnectionRole::Initiator);
        assert_eq!(config.heartbeat_interval_secs(), 30);
        assert_eq!(config.reconnect_interval, Duration::from_secs(30));
        assert!(!config.reset_on_logon);
    }

    #[test]
    fn test_session_config_overrides() {
        let (mut settings, id) = settings_with("acceptor");
        settings.set_default(keys::HEART_BT_INT, "5");
        settings.set(&id, keys::RECONNECT_INTERVAL, "1");
        settings.set(&id, keys::RESET_ON_LOGON, "Y");

        let config = SessionConfig::from_settings(&settings, &id).unwrap();
        assert_eq!(config.role, ConnectionRole::Acceptor);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_interval, Duration::from_secs(1));
        assert!(config.reset_on_logon);
    }

    #[test]
    fn test_session_config_rejects_bad_values() {
        let (settings, id) = settings_with("broker");
        assert!(matches!(
            SessionConfig::from_settings(&settings, &id),
            Err(ConfigError::InvalidSetting { .. })
        ));

        let (mut settings, id) = settings_with("initiator");
        settings.set(&id, keys::HEART_BT_INT, "-3");
        assert!(SessionConfig::from_settings(&settings, &id).is_err());
    }

    #[test]
    fn test_zero_reconnect_interval_is_rejected() {
        let (mut settings, id) = settings_with("initiator");
        settings.set(&id, keys::RECONNECT_INTERVAL, "0");
        assert!(matches!(
            SessionConfig::from_settings(&settings, &id),
            Err(ConfigError::InvalidSetting { key, value, .. })
                if key == keys::RECONNECT_INTERVAL && value == "0"
        ));

        let config = SessionConfig::new(ConnectionRole::Initiator)
            .with_reconnect_interval(Duration::ZERO);
        assert_eq!(config.reconnect_interval, MIN_RECONNECT_INTERVAL);
    }
}
