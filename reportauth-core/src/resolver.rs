//! Report server endpoint discovery over the management query capability.
//!
//! One call opens one scope on `\\{machine}\{namespace}`, finds the `MSReportServer_Instance`
//! whose prefixed instance name matches the caller's, asks it for its URL reservations and
//! returns the web service URL with the service path appended. Nothing is cached.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::inventory::InstanceRecord;
use crate::management::{
    AuthenticationLevel, ConnectionOptions, ManagementError, ManagementQuery, ManagementScope,
    ManagementValue, ObjectPath, OutParams,
};

/// Target host and named report server instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostLocator {
    pub machine_name: String,
    pub instance_name: String,
}

impl HostLocator {
    pub fn new(machine_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            instance_name: instance_name.into(),
        }
    }
}

impl fmt::Display for HostLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r"{}\{}", self.machine_name, self.instance_name)
    }
}

/// Discovered service URL (base URL with the service path suffix). Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    base_url: String,
}

impl ResolvedEndpoint {
    pub(crate) fn new(url: &str, suffix: &str) -> Self {
        Self {
            base_url: format!("{}{}", url, suffix),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn into_string(self) -> String {
        self.base_url
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// A matched instance and its URL reservations, in reported order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceInstanceRecord {
    pub instance_name: String,
    /// (application name, url) pairs; duplicates are kept.
    pub application_endpoints: Vec<(String, String)>,
}

impl ServiceInstanceRecord {
    pub fn new(instance_name: &str) -> Self {
        Self {
            instance_name: instance_name.to_owned(),
            application_endpoints: Vec::new(),
        }
    }

    pub fn endpoint(mut self, application: &str, url: &str) -> Self {
        self.application_endpoints
            .push((application.to_owned(), url.to_owned()));
        self
    }

    /// URL of the first reservation for `application` (exact, case-sensitive).
    pub fn service_url(&self, application: &str) -> Option<&str> {
        self.application_endpoints
            .iter()
            .find(|(app, _)| app == application)
            .map(|(_, url)| url.as_str())
    }

    /// Inventory instance exposing this record under the property/method names in `config`.
    pub fn to_instance(&self, config: &DiscoveryConfig) -> InstanceRecord {
        let (apps, urls): (Vec<String>, Vec<String>) =
            self.application_endpoints.iter().cloned().unzip();
        let out: OutParams = [
            (config.application_names_param.clone(), ManagementValue::from(apps)),
            (config.urls_param.clone(), ManagementValue::from(urls)),
        ]
        .into_iter()
        .collect();
        InstanceRecord::new()
            .property(&config.instance_name_property, self.instance_name.as_str())
            .method(&config.method_name, out)
    }
}

/// What went wrong during discovery.
#[derive(Error, Debug)]
pub enum DiscoveryErrorKind {
    #[error("could not connect to management namespace {namespace}")]
    Connection { namespace: String },
    #[error("management class {class} not found")]
    ClassResolution { class: String },
    #[error("no report server instance matches {instance}")]
    NoMatchingInstance { instance: String },
    #[error("no URL registered for application {application}")]
    NoServiceUrl { application: String },
    #[error("management query failed")]
    Query,
}

/// The single failure type of discovery. Carries the transport error, if any, as its source.
#[derive(Error, Debug)]
#[error(
    "failed to resolve report server URL for {locator}: {kind}{}",
    .source.as_ref().map(|e| format!(": {}", e)).unwrap_or_default()
)]
pub struct DiscoveryError {
    pub locator: HostLocator,
    pub kind: DiscoveryErrorKind,
    #[source]
    pub source: Option<ManagementError>,
}

impl DiscoveryError {
    pub fn new(locator: &HostLocator, kind: DiscoveryErrorKind, source: Option<ManagementError>) -> Self {
        Self {
            locator: locator.clone(),
            kind,
            source,
        }
    }
}

type Failure = (DiscoveryErrorKind, Option<ManagementError>);

fn query_failed(e: ManagementError) -> Failure {
    (DiscoveryErrorKind::Query, Some(e))
}

/// Resolves report server endpoints. Holds no per-call state; safe to share across tasks.
#[derive(Clone)]
pub struct EndpointResolver {
    query: Arc<dyn ManagementQuery>,
    config: DiscoveryConfig,
}

impl EndpointResolver {
    pub fn new(query: Arc<dyn ManagementQuery>, config: DiscoveryConfig) -> Self {
        Self { query, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// `\\{machine}` followed by the namespace template with `{0}` replaced by the instance name.
    pub fn namespace_path(&self, locator: &HostLocator) -> String {
        format!(
            r"\\{}{}",
            locator.machine_name,
            self.config
                .namespace_template
                .replace("{0}", &locator.instance_name)
        )
    }

    /// Always packet privacy; only the timeout comes from configuration.
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            authentication: AuthenticationLevel::PacketPrivacy,
            timeout: self.config.connect_timeout(),
        }
    }

    /// Caller's name against `prefix + reported`, upper-cased on both sides.
    pub fn instance_matches(&self, requested: &str, reported: &str) -> bool {
        requested.to_uppercase()
            == format!("{}{}", self.config.instance_name_prefix, reported).to_uppercase()
    }

    /// Resolve the web service URL of `locator`'s report server.
    pub async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError> {
        let namespace = self.namespace_path(locator);
        debug!(%locator, %namespace, "resolving report server url");
        match self.lookup(locator, &namespace).await {
            Ok(url) => {
                let endpoint = ResolvedEndpoint::new(&url, &self.config.service_path_suffix);
                info!(%locator, url = %endpoint, "resolved report server url");
                Ok(endpoint)
            }
            Err((kind, source)) => {
                let err = DiscoveryError::new(locator, kind, source);
                warn!(error = %err, "report server discovery failed");
                Err(err)
            }
        }
    }

    async fn lookup(&self, locator: &HostLocator, namespace: &str) -> Result<String, Failure> {
        let cfg = &self.config;
        let scope = self
            .query
            .connect(namespace, &self.connection_options())
            .await
            .map_err(|e| {
                (
                    DiscoveryErrorKind::Connection {
                        namespace: namespace.to_owned(),
                    },
                    Some(e),
                )
            })?;

        let class_not_found = || DiscoveryErrorKind::ClassResolution {
            class: cfg.class_name.clone(),
        };
        let class = scope
            .resolve_class(&cfg.class_name)
            .await
            .map_err(|e| (class_not_found(), Some(e)))?
            .ok_or_else(|| (class_not_found(), None))?;

        let instances = scope.list_instances(&class).await.map_err(query_failed)?;
        for instance in &instances {
            let reported = scope
                .get_property(instance, &cfg.instance_name_property)
                .await
                .map_err(query_failed)?;
            let reported = reported.as_str().ok_or_else(|| {
                query_failed(ManagementError::Malformed(format!(
                    "{} of {} is not a string",
                    cfg.instance_name_property, instance
                )))
            })?;
            if !self.instance_matches(&locator.instance_name, reported) {
                continue;
            }
            debug!(%instance, reported, "matched report server instance");

            // First matching instance decides the outcome; later instances are not tried.
            let url = self
                .service_url(scope.as_ref(), instance)
                .await
                .map_err(query_failed)?;
            return url.filter(|url| !url.is_empty()).ok_or_else(|| {
                (
                    DiscoveryErrorKind::NoServiceUrl {
                        application: cfg.service_application_name.clone(),
                    },
                    None,
                )
            });
        }

        Err((
            DiscoveryErrorKind::NoMatchingInstance {
                instance: locator.instance_name.clone(),
            },
            None,
        ))
    }

    /// URL paired with the first `service_application_name` entry. The arrays are parallel;
    /// only the matched index has to exist in `urls`.
    async fn service_url(
        &self,
        scope: &dyn ManagementScope,
        instance: &ObjectPath,
    ) -> Result<Option<String>, ManagementError> {
        let cfg = &self.config;
        let out = scope.invoke_method(instance, &cfg.method_name).await?;
        let apps = out.string_array(&cfg.application_names_param)?;
        let urls = out.string_array(&cfg.urls_param)?;
        let Some(i) = apps.iter().position(|app| *app == cfg.service_application_name) else {
            return Ok(None);
        };
        match urls.get(i) {
            Some(url) => Ok(Some(url.clone())),
            None => Err(ManagementError::Malformed(format!(
                "{} returned no url for {} at index {} ({} urls)",
                cfg.method_name,
                cfg.service_application_name,
                i,
                urls.len()
            ))),
        }
    }
}
