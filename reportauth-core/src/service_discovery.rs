//! Service discovery trait: resolve(locator) -> report server URL. Shared by the resolver and static config.

use async_trait::async_trait;

use crate::resolver::{DiscoveryError, DiscoveryErrorKind, EndpointResolver, HostLocator, ResolvedEndpoint};

/// How the extension finds its report server. Implementations: management query, static config.
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError>;
}

#[async_trait]
impl ServiceDiscovery for EndpointResolver {
    async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError> {
        EndpointResolver::resolve(self, locator).await
    }
}

/// Fixed report server URL from configuration. The locator is ignored.
#[derive(Clone, Debug)]
pub struct StaticDiscovery {
    url: String,
    service_path_suffix: String,
}

impl StaticDiscovery {
    pub fn new(url: impl Into<String>, service_path_suffix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_path_suffix: service_path_suffix.into(),
        }
    }
}

#[async_trait]
impl ServiceDiscovery for StaticDiscovery {
    async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError> {
        if self.url.is_empty() {
            return Err(DiscoveryError::new(
                locator,
                DiscoveryErrorKind::NoServiceUrl {
                    application: "static".to_owned(),
                },
                None,
            ));
        }
        Ok(ResolvedEndpoint::new(&self.url, &self.service_path_suffix))
    }
}
