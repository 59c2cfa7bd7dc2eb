//! Reportauth core: report server endpoint discovery, logon policy, ticket issuance, logon endpoint.

pub mod config;
pub mod http;
pub mod inventory;
pub mod logon;
pub mod management;
pub mod resolver;
pub mod service_discovery;
pub mod ticket;

pub use config::{Config, DiscoveryConfig, LogonConfig, ServerConfig, TicketConfig};
pub use inventory::{InstanceRecord, Inventory, Namespace};
pub use logon::{LogonAction, LogonPolicy, LogonRequest, Principal};
pub use management::{
    AuthenticationLevel, ConnectionOptions, ManagementError, ManagementQuery, ManagementScope,
    ManagementValue, ObjectPath, OutParams,
};
pub use resolver::{
    DiscoveryError, DiscoveryErrorKind, EndpointResolver, HostLocator, ResolvedEndpoint,
    ServiceInstanceRecord,
};
pub use service_discovery::{ServiceDiscovery, StaticDiscovery};
pub use ticket::{redirect_from_login_page, AuthTicket, CookieTicketIssuer, Redirect, TicketError, TicketIssuer};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Ticket(#[from] TicketError),
}
