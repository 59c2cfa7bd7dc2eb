//! Configuration: JSON file with per-section defaults, HOST/PORT from env on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::CoreError;

/// Top-level configuration. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub discovery: DiscoveryConfig,
    pub logon: LogonConfig,
    pub ticket: TicketConfig,
    /// JSON snapshot used as the management query capability.
    pub inventory: Option<PathBuf>,
}

impl Config {
    /// Read a JSON config file. Env overrides are not applied here; see [`Config::apply_env`].
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// HOST and PORT environment variables override the file.
    pub fn apply_env(&mut self) -> Result<(), CoreError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| CoreError::Config(format!("PORT is not a valid port: {:?}", port)))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
        }
    }
}

/// Where and how to look up the report server web service URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub machine_name: String,
    /// Instance name as used in the namespace, e.g. `RS_MSSQLSERVER`.
    pub instance_name: String,
    /// `{0}` is replaced by the instance name; the result is prefixed with `\\{machine_name}`.
    pub namespace_template: String,
    pub class_name: String,
    pub instance_name_property: String,
    pub method_name: String,
    pub application_names_param: String,
    pub urls_param: String,
    pub service_application_name: String,
    pub service_path_suffix: String,
    /// Prepended to the reported instance name before comparing with the caller's.
    pub instance_name_prefix: String,
    /// Handed to the transport; unset keeps the transport default.
    pub connect_timeout_ms: Option<u64>,
    /// Fixed report server URL. When set, the management query is skipped.
    pub report_server_url: Option<String>,
}

impl DiscoveryConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            machine_name: "localhost".to_owned(),
            instance_name: "RS_MSSQLSERVER".to_owned(),
            namespace_template: r"\root\Microsoft\SqlServer\ReportServer\{0}\v11".to_owned(),
            class_name: "MSReportServer_Instance".to_owned(),
            instance_name_property: "InstanceName".to_owned(),
            method_name: "GetReportServerUrls".to_owned(),
            application_names_param: "ApplicationName".to_owned(),
            urls_param: "URLs".to_owned(),
            service_application_name: "ReportServerWebService".to_owned(),
            service_path_suffix: "/ReportService2010.asmx".to_owned(),
            instance_name_prefix: "RS_".to_owned(),
            connect_timeout_ms: None,
            report_server_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogonConfig {
    pub logon_path: String,
    pub anonymous_principal: String,
    /// Log every visitor in anonymously. When false, only requests carrying
    /// `return_url_param` are; the rest get the credential form.
    pub anonymous_only: bool,
    pub return_url_param: String,
    pub default_url: String,
}

impl Default for LogonConfig {
    fn default() -> Self {
        Self {
            logon_path: "/Logon.aspx".to_owned(),
            anonymous_principal: "Anonymous".to_owned(),
            anonymous_only: true,
            return_url_param: "ReturnUrl".to_owned(),
            default_url: "/".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TicketConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub secure: bool,
    /// Lifetime of persistent tickets. Session tickets carry no expiry.
    pub timeout_minutes: u64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sqlAuthCookie".to_owned(),
            cookie_path: "/".to_owned(),
            secure: false,
            timeout_minutes: 30,
        }
    }
}
