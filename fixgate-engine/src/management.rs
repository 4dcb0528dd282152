/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Management registry.
//!
//! An engine that runs with `UseManagement=Y` registers each started
//! connector under a name of the form
//! `org.fixgate:type=Connector,role=Initiator,id=1`. The registry belongs
//! to the engine instance, so two engines in one process never see each
//! other's entries.

use fixgate_core::types::{ConnectionRole, SessionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::connector::ThreadModel;

/// Domain of every name registered by an engine.
pub const DOMAIN: &str = "org.fixgate";

/// Errors raised by the management registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManagementError {
    /// A name or pattern could not be parsed.
    #[error("malformed object name '{0}'")]
    MalformedName(String),
}

/// A `domain:key=value,...` name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Creates a name with no properties.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            properties: Vec::new(),
        }
    }

    /// Appends a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Returns the domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the value of a property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectName {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = ObjectPattern::from_str(s)?;
        match pattern {
            ObjectPattern {
                domain: Some(domain),
                properties,
                open: false,
            } if !properties.is_empty() => Ok(Self { domain, properties }),
            _ => Err(ManagementError::MalformedName(s.to_string())),
        }
    }
}

/// A query pattern.
///
/// `org.fixgate:type=Connector,role=Acceptor,*` matches every name in the
/// domain carrying both properties; without the trailing `*` the property
/// set must match exactly. A domain of `*` matches any domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPattern {
    domain: Option<String>,
    properties: Vec<(String, String)>,
    open: bool,
}

impl ObjectPattern {
    /// Returns true if `name` matches this pattern.
    #[must_use]
    pub fn matches(&self, name: &ObjectName) -> bool {
        if self.domain.as_deref().is_some_and(|d| d != name.domain) {
            return false;
        }
        let all_present = self
            .properties
            .iter()
            .all(|(k, v)| name.property(k) == Some(v.as_str()));
        all_present && (self.open || self.properties.len() == name.properties.len())
    }
}

impl FromStr for ObjectPattern {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ManagementError::MalformedName(s.to_string());
        let (domain, rest) = s.split_once(':').ok_or_else(malformed)?;
        if domain.is_empty() {
            return Err(malformed());
        }

        let mut properties = Vec::new();
        let mut open = false;
        for part in rest.split(',').filter(|p| !p.is_empty()) {
            if part == "*" {
                open = true;
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(malformed)?;
            if key.is_empty() || value.is_empty() {
                return Err(malformed());
            }
            properties.push((key.to_string(), value.to_string()));
        }

        Ok(Self {
            domain: (domain != "*").then(|| domain.to_string()),
            properties,
            open: open || rest.is_empty(),
        })
    }
}

/// Point-in-time view of a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSnapshot {
    /// Connection role.
    pub role: ConnectionRole,
    /// Thread model the connector runs with.
    pub thread_model: ThreadModel,
    /// All sessions owned by the connector.
    pub sessions: Vec<SessionId>,
    /// Sessions whose logon bracket is open.
    pub logged_on: Vec<SessionId>,
}

/// Something the registry can report on.
pub trait Managed: Send + Sync {
    /// Returns the current state.
    fn snapshot(&self) -> ConnectorSnapshot;
}

/// Engine-owned registry of managed connectors.
#[derive(Default)]
pub struct ManagementRegistry {
    entries: RwLock<BTreeMap<ObjectName, Arc<dyn Managed>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ManagementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagementRegistry")
            .field("entries", &self.entries.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ManagementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connector and returns the name it was given.
    pub fn register(&self, role: ConnectionRole, target: Arc<dyn Managed>) -> ObjectName {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let name = ObjectName::new(DOMAIN)
            .with_property("type", "Connector")
            .with_property("role", role.to_string())
            .with_property("id", id.to_string());
        self.entries.write().insert(name.clone(), target);
        name
    }

    /// Removes an entry. Returns false if it was not registered.
    pub fn unregister(&self, name: &ObjectName) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Returns the names matching `pattern`, in name order.
    ///
    /// # Errors
    /// Returns `ManagementError::MalformedName` if the pattern cannot be
    /// parsed.
    pub fn query(&self, pattern: &str) -> Result<Vec<ObjectName>, ManagementError> {
        let pattern: ObjectPattern = pattern.parse()?;
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect())
    }

    /// Returns the current state of a registered connector.
    #[must_use]
    pub fn snapshot(&self, name: &ObjectName) -> Option<ConnectorSnapshot> {
        let target = self.entries.read().get(name).map(Arc::clone)?;
        Some(target.snapshot())
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
