//! Ticket issuance and "redirect from login page": set the auth cookie, send the visitor on.

use thiserror::Error;
use uuid::Uuid;

use crate::config::TicketConfig;
use crate::logon::Principal;

#[derive(Error, Debug)]
pub enum TicketError {
    #[error("principal must not be empty")]
    EmptyPrincipal,
    #[error("ticket issuance failed: {0}")]
    Issuer(String),
}

/// An issued authentication ticket and the `Set-Cookie` value that carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthTicket {
    pub principal: Principal,
    pub persistent: bool,
    pub set_cookie: String,
}

/// Issues authentication tickets for a principal. The session store behind it is external.
pub trait TicketIssuer: Send + Sync {
    fn issue(&self, principal: &Principal, persistent: bool) -> Result<AuthTicket, TicketError>;
}

/// Opaque random ticket in an HttpOnly cookie. Non-persistent tickets are session cookies.
#[derive(Clone, Debug)]
pub struct CookieTicketIssuer {
    config: TicketConfig,
}

impl CookieTicketIssuer {
    pub fn new(config: TicketConfig) -> Self {
        Self { config }
    }
}

impl TicketIssuer for CookieTicketIssuer {
    fn issue(&self, principal: &Principal, persistent: bool) -> Result<AuthTicket, TicketError> {
        if principal.as_str().is_empty() {
            return Err(TicketError::EmptyPrincipal);
        }
        let mut cookie = format!(
            "{}={}; Path={}; HttpOnly",
            self.config.cookie_name,
            Uuid::new_v4().simple(),
            self.config.cookie_path
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        if persistent {
            let max_age = self.config.timeout_minutes.saturating_mul(60);
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        Ok(AuthTicket {
            principal: principal.clone(),
            persistent,
            set_cookie: cookie,
        })
    }
}

/// Where to send the visitor and the cookie to set on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub ticket: AuthTicket,
}

/// Issue a ticket for `principal` and redirect to `return_url`, or to `default_url` when the
/// return target is missing or not a local path.
pub fn redirect_from_login_page(
    issuer: &dyn TicketIssuer,
    principal: &Principal,
    persistent: bool,
    return_url: Option<&str>,
    default_url: &str,
) -> Result<Redirect, TicketError> {
    let ticket = issuer.issue(principal, persistent)?;
    let location = return_url
        .filter(|url| is_local_url(url))
        .unwrap_or(default_url)
        .to_owned();
    Ok(Redirect { location, ticket })
}

/// `/path...` on this host: no scheme, no `//host`, no backslashes, visible ASCII only.
pub fn is_local_url(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && url.bytes().all(|b| b.is_ascii_graphic())
}
