//! Logon policy: log the visitor in as the anonymous principal or show the credential form.

use std::fmt;

use tracing::debug;

use crate::config::LogonConfig;

/// Authenticated identity name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The parts of a logon page request the policy looks at: decoded query parameters, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogonRequest {
    query: Vec<(String, String)>,
}

impl LogonRequest {
    /// Parse a raw (percent-encoded) query string.
    pub fn from_query(query: Option<&str>) -> Self {
        let query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .filter(|(k, _)| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { query }
    }

    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// First value of `name`; keys compare case-insensitively.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogonAction {
    RedirectAsAnonymous(Principal),
    ShowForm,
}

/// Per-request decision; reads only the request and static configuration.
#[derive(Clone, Debug)]
pub struct LogonPolicy {
    anonymous_principal: Principal,
    anonymous_only: bool,
    return_url_param: String,
}

impl LogonPolicy {
    pub fn new(anonymous_principal: Principal, anonymous_only: bool, return_url_param: &str) -> Self {
        Self {
            anonymous_principal,
            anonymous_only,
            return_url_param: return_url_param.to_owned(),
        }
    }

    pub fn from_config(cfg: &LogonConfig) -> Self {
        Self::new(
            Principal::new(cfg.anonymous_principal.clone()),
            cfg.anonymous_only,
            &cfg.return_url_param,
        )
    }

    pub fn anonymous_principal(&self) -> &Principal {
        &self.anonymous_principal
    }

    /// Return target carried by the request, if any (still unvalidated).
    pub fn return_url<'r>(&self, request: &'r LogonRequest) -> Option<&'r str> {
        request.param(&self.return_url_param)
    }

    /// Anonymous redirect when configured for it, or when the request names a return target.
    pub fn on_logon_request(&self, request: &LogonRequest) -> LogonAction {
        let action = if self.anonymous_only || self.return_url(request).is_some() {
            LogonAction::RedirectAsAnonymous(self.anonymous_principal.clone())
        } else {
            LogonAction::ShowForm
        };
        debug!(?action, anonymous_only = self.anonymous_only, "logon decision");
        action
    }
}
