//! Discovery: pick the ServiceDiscovery adapter the extension resolves its report server with.

use std::sync::Arc;

use reportauth_core::{
    Config, DiscoveryConfig, EndpointResolver, Inventory, ManagementQuery, ServiceDiscovery,
    StaticDiscovery,
};
use tracing::debug;

use crate::extension::ExtensionError;

/// Discovery as object: one adapter (management query, static URL, or custom).
pub struct DiscoveryModule {
    adapter: Option<Arc<dyn ServiceDiscovery>>,
}

impl DiscoveryModule {
    pub fn new() -> Self {
        Self { adapter: None }
    }

    /// Fixed URL; the suffix is appended like a discovered one.
    pub fn static_discovery(mut self, url: &str, service_path_suffix: &str) -> Self {
        self.adapter = Some(Arc::new(StaticDiscovery::new(url, service_path_suffix)));
        self
    }

    /// Query the host's management namespace on every resolve.
    pub fn management(mut self, query: Arc<dyn ManagementQuery>, config: DiscoveryConfig) -> Self {
        self.adapter = Some(Arc::new(EndpointResolver::new(query, config)));
        self
    }

    /// Use custom implementation.
    pub fn adapter(mut self, impl_: impl ServiceDiscovery + 'static) -> Self {
        self.adapter = Some(Arc::new(impl_));
        self
    }

    /// `discovery.report_server_url` wins; otherwise the `inventory` snapshot backs the management query.
    pub fn from_config(config: &Config) -> Result<Self, ExtensionError> {
        let discovery = &config.discovery;
        if let Some(url) = &discovery.report_server_url {
            debug!(%url, "using static report server url");
            return Ok(Self::new().static_discovery(url, &discovery.service_path_suffix));
        }
        let path = config
            .inventory
            .as_deref()
            .ok_or(ExtensionError::NoManagementQuery)?;
        debug!(path = %path.display(), "loading management inventory");
        let inventory = Inventory::load(path)?;
        Ok(Self::new().management(Arc::new(inventory), discovery.clone()))
    }

    pub(crate) fn into_adapter(self) -> Result<Arc<dyn ServiceDiscovery>, ExtensionError> {
        self.adapter.ok_or(ExtensionError::NoManagementQuery)
    }
}

impl Default for DiscoveryModule {
    fn default() -> Self {
        Self::new()
    }
}
