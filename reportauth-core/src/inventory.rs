//! In-memory management inventory: namespaces -> classes -> instances. Loadable from a JSON snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::management::{
    AuthenticationLevel, ConnectionOptions, ManagementError, ManagementQuery, ManagementScope,
    ManagementValue, ObjectPath, OutParams,
};
use crate::CoreError;

/// One instance: its properties and the output of each method it supports.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceRecord {
    pub properties: HashMap<String, ManagementValue>,
    pub methods: HashMap<String, OutParams>,
}

impl InstanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, value: impl Into<ManagementValue>) -> Self {
        self.properties.insert(name.to_owned(), value.into());
        self
    }

    pub fn method(mut self, name: &str, out: OutParams) -> Self {
        self.methods.insert(name.to_owned(), out);
        self
    }
}

/// Classes in one namespace; instance order is enumeration order.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Namespace {
    pub classes: HashMap<String, Vec<InstanceRecord>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, name: &str, instances: Vec<InstanceRecord>) -> Self {
        self.classes.insert(name.to_owned(), instances);
        self
    }
}

/// Management capability backed by a static snapshot. Namespace paths match case-insensitively.
/// Only accepts connections at [`AuthenticationLevel::PacketPrivacy`], like the report server provider.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Inventory {
    namespaces: HashMap<String, Arc<Namespace>>,
    #[serde(skip)]
    open_scopes: Arc<AtomicUsize>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace under its full path (e.g. `\\HOST\root\...\RS_X\v11`).
    pub fn namespace(mut self, path: &str, namespace: Namespace) -> Self {
        self.namespaces.insert(path.to_owned(), Arc::new(namespace));
        self
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Scopes currently connected and not yet dropped.
    pub fn open_scopes(&self) -> usize {
        self.open_scopes.load(Ordering::SeqCst)
    }

    fn find(&self, path: &str) -> Option<Arc<Namespace>> {
        self.namespaces
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(path))
            .map(|(_, ns)| Arc::clone(ns))
    }
}

#[async_trait]
impl ManagementQuery for Inventory {
    async fn connect(
        &self,
        namespace: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn ManagementScope>, ManagementError> {
        if options.authentication != AuthenticationLevel::PacketPrivacy {
            return Err(ManagementError::AccessDenied(format!(
                "{} requires packet privacy",
                namespace
            )));
        }
        let ns = self
            .find(namespace)
            .ok_or_else(|| ManagementError::NamespaceNotFound(namespace.to_owned()))?;
        self.open_scopes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InventoryScope {
            namespace: ns,
            open_scopes: Arc::clone(&self.open_scopes),
        }))
    }
}

struct InventoryScope {
    namespace: Arc<Namespace>,
    open_scopes: Arc<AtomicUsize>,
}

impl InventoryScope {
    fn instance(&self, object: &ObjectPath) -> Result<&InstanceRecord, ManagementError> {
        object
            .key
            .as_deref()
            .and_then(|k| k.parse::<usize>().ok())
            .and_then(|i| self.namespace.classes.get(&object.class_name)?.get(i))
            .ok_or_else(|| ManagementError::ObjectNotFound(object.to_string()))
    }
}

impl Drop for InventoryScope {
    fn drop(&mut self) {
        self.open_scopes.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ManagementScope for InventoryScope {
    async fn resolve_class(&self, class_name: &str) -> Result<Option<ObjectPath>, ManagementError> {
        Ok(self
            .namespace
            .classes
            .contains_key(class_name)
            .then(|| ObjectPath::class(class_name)))
    }

    async fn list_instances(&self, class: &ObjectPath) -> Result<Vec<ObjectPath>, ManagementError> {
        let instances = self
            .namespace
            .classes
            .get(&class.class_name)
            .ok_or_else(|| ManagementError::ObjectNotFound(class.to_string()))?;
        Ok((0..instances.len())
            .map(|i| ObjectPath::instance(&class.class_name, i.to_string()))
            .collect())
    }

    async fn get_property(
        &self,
        object: &ObjectPath,
        name: &str,
    ) -> Result<ManagementValue, ManagementError> {
        Ok(self
            .instance(object)?
            .properties
            .get(name)
            .cloned()
            .unwrap_or(ManagementValue::Null))
    }

    async fn invoke_method(
        &self,
        object: &ObjectPath,
        method: &str,
    ) -> Result<OutParams, ManagementError> {
        self.instance(object)?
            .methods
            .get(method)
            .cloned()
            .ok_or_else(|| ManagementError::MethodNotFound {
                object: object.to_string(),
                method: method.to_owned(),
            })
    }
}
