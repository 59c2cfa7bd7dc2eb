//! Reportauth extension facade: Extension, DiscoveryModule, wired from Config on reportauth-core.

pub mod discovery;
pub mod extension;

pub use discovery::DiscoveryModule;
pub use extension::{Extension, ExtensionError};
pub use reportauth_core::{Config, CoreError, DiscoveryError, HostLocator, ResolvedEndpoint};
