//! Extension: configuration, report server discovery and the logon endpoint in one place.

use std::sync::Arc;

use reportauth_core::http::{self, LogonService};
use reportauth_core::{
    Config, CoreError, DiscoveryError, HostLocator, ResolvedEndpoint, ServiceDiscovery,
};
use thiserror::Error;

use crate::discovery::DiscoveryModule;

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("no way to discover the report server: set `inventory` or `discovery.report_server_url`")]
    NoManagementQuery,
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// The extension as used by bootstrap code: resolve the report server, serve the logon page.
/// Discovery and logon share nothing but the configuration they were built from.
pub struct Extension {
    config: Config,
    discovery: Arc<dyn ServiceDiscovery>,
    logon: Arc<LogonService>,
}

impl Extension {
    pub fn new(config: Config, discovery: DiscoveryModule) -> Result<Self, ExtensionError> {
        let logon = Arc::new(LogonService::from_config(&config.logon, &config.ticket));
        Ok(Self {
            discovery: discovery.into_adapter()?,
            logon,
            config,
        })
    }

    pub fn from_config(config: Config) -> Result<Self, ExtensionError> {
        let discovery = DiscoveryModule::from_config(&config)?;
        Self::new(config, discovery)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Host and instance from `discovery.machine_name` / `discovery.instance_name`.
    pub fn locator(&self) -> HostLocator {
        HostLocator::new(
            self.config.discovery.machine_name.clone(),
            self.config.discovery.instance_name.clone(),
        )
    }

    /// Resolve the configured report server. Re-resolves on every call.
    pub async fn report_server_url(&self) -> Result<ResolvedEndpoint, DiscoveryError> {
        self.resolve(&self.locator()).await
    }

    pub async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError> {
        self.discovery.resolve(locator).await
    }

    pub fn logon(&self) -> &LogonService {
        &self.logon
    }

    /// Serve the logon endpoint on `server.host:server.port` (blocks until Ctrl-C).
    pub fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        http::run(self.logon, &self.config.server.host, self.config.server.port)
    }
}
