//! Logon endpoint without a socket: request head in, response out.

use std::sync::Arc;

use http::{header, Method, StatusCode, Uri};
use reportauth_core::http::LogonService;
use reportauth_core::{CookieTicketIssuer, LogonConfig, LogonPolicy, Principal, TicketConfig};

fn service(anonymous_only: bool) -> LogonService {
    LogonService::new(
        LogonPolicy::new(Principal::new("Anonymous"), anonymous_only, "ReturnUrl"),
        Arc::new(CookieTicketIssuer::new(TicketConfig::default())),
        "/Logon.aspx",
        "/ReportServer",
    )
}

fn uri(s: &str) -> Uri {
    s.parse().unwrap()
}

#[test]
fn anonymous_redirect_sets_cookie_and_location() {
    let resp = service(true).handle(&Method::GET, &uri("/logon.aspx?ReturnUrl=%2fReportServer%2fPages"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/ReportServer/Pages");
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("sqlAuthCookie="));
}

#[test]
fn redirect_without_return_url_goes_to_default() {
    let resp = service(true).handle(&Method::GET, &uri("/Logon.aspx"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/ReportServer");
}

#[test]
fn form_is_shown_when_enabled_and_no_return_url() {
    let resp = service(false).handle(&Method::GET, &uri("/Logon.aspx"));
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[test]
fn head_behaves_like_get() {
    let resp = service(true).handle(&Method::HEAD, &uri("/Logon.aspx?ReturnUrl=%2fReportServer"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/ReportServer");
    assert!(resp.headers().contains_key(header::SET_COOKIE));

    let resp = service(false).handle(&Method::HEAD, &uri("/Logon.aspx"));
    assert_eq!(resp.status(), StatusCode::OK);
}

#[test]
fn other_methods_and_paths() {
    let svc = service(true);
    let resp = svc.handle(&Method::POST, &uri("/Logon.aspx"));
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()[header::ALLOW], "GET, HEAD");

    let resp = svc.handle(&Method::GET, &uri("/elsewhere"));
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
}

#[test]
fn service_from_config() {
    let svc = LogonService::from_config(&LogonConfig::default(), &TicketConfig::default());
    assert_eq!(svc.policy().anonymous_principal().as_str(), "Anonymous");
    let resp = svc.handle(&Method::GET, &uri("/Logon.aspx?ReturnUrl=http%3a%2f%2fevil"));
    assert_eq!(resp.headers()[header::LOCATION], "/");
}
