//! Management query capability: connect to a host namespace, resolve a class, enumerate instances,
//! read properties and invoke methods. Implementations: in-memory inventory, host transports.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Transport-level failure. Never leaves the resolver unwrapped.
#[derive(Error, Debug)]
pub enum ManagementError {
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    #[error("method {method:?} not supported on {object}")]
    MethodNotFound { object: String, method: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Authentication level requested for the connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AuthenticationLevel {
    Default,
    None,
    Connect,
    Call,
    Packet,
    PacketIntegrity,
    /// Signs and encrypts every packet. Strongest level.
    #[default]
    PacketPrivacy,
}

/// Options for opening a scope. `timeout: None` leaves the transport default in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub authentication: AuthenticationLevel,
    pub timeout: Option<Duration>,
}

/// Path of a class or of an instance of that class within a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    pub class_name: String,
    /// Instance key; `None` for the class itself.
    pub key: Option<String>,
}

impl ObjectPath {
    pub fn class(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_owned(),
            key: None,
        }
    }

    pub fn instance(class_name: &str, key: impl Into<String>) -> Self {
        Self {
            class_name: class_name.to_owned(),
            key: Some(key.into()),
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}.{}", self.class_name, key),
            None => f.write_str(&self.class_name),
        }
    }
}

/// Property or output-parameter value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ManagementValue {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    StringArray(Vec<String>),
}

impl ManagementValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            Self::StringArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for ManagementValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<String>> for ManagementValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

/// Named output parameters of a method invocation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct OutParams(pub HashMap<String, ManagementValue>);

impl OutParams {
    pub fn get(&self, name: &str) -> Option<&ManagementValue> {
        self.0.get(name)
    }

    /// String-array parameter. Missing or differently typed parameters are malformed output.
    pub fn string_array(&self, name: &str) -> Result<&[String], ManagementError> {
        self.get(name)
            .and_then(ManagementValue::as_string_array)
            .ok_or_else(|| {
                ManagementError::Malformed(format!("output parameter {:?} is not a string array", name))
            })
    }
}

impl<K: Into<String>> FromIterator<(K, ManagementValue)> for OutParams {
    fn from_iter<T: IntoIterator<Item = (K, ManagementValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Opens scopes on a host's management namespace.
#[async_trait]
pub trait ManagementQuery: Send + Sync {
    /// Connect to `namespace` (e.g. `\\HOST\root\...`). A failed connect must not leave a scope behind.
    async fn connect(
        &self,
        namespace: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn ManagementScope>, ManagementError>;
}

/// An open connection. Released when dropped.
#[async_trait]
pub trait ManagementScope: Send + Sync {
    /// `Ok(None)` when the class does not exist in this namespace.
    async fn resolve_class(&self, class_name: &str) -> Result<Option<ObjectPath>, ManagementError>;

    async fn list_instances(&self, class: &ObjectPath) -> Result<Vec<ObjectPath>, ManagementError>;

    async fn get_property(
        &self,
        object: &ObjectPath,
        name: &str,
    ) -> Result<ManagementValue, ManagementError>;

    async fn invoke_method(
        &self,
        object: &ObjectPath,
        method: &str,
    ) -> Result<OutParams, ManagementError>;
}
