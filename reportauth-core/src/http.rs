//! Async HTTP server: tokio + hyper. Serves the logon page.
//! Host/port come from config; HOST/PORT env and CLI flags are applied by the caller.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ALLOW, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{LogonConfig, TicketConfig};
use crate::logon::{LogonAction, LogonPolicy, LogonRequest};
use crate::ticket::{redirect_from_login_page, CookieTicketIssuer, TicketIssuer};

const LOGON_FORM_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Log on</title></head>
<body>
<form method="post" action="">
<label>User name <input type="text" name="user" autocomplete="username"></label>
<label>Password <input type="password" name="password" autocomplete="current-password"></label>
<button type="submit">Log on</button>
</form>
</body>
</html>"#;

/// Logon endpoint: policy + ticket issuer behind one path.
pub struct LogonService {
    policy: LogonPolicy,
    issuer: Arc<dyn TicketIssuer>,
    logon_path: String,
    default_url: String,
}

impl LogonService {
    pub fn new(
        policy: LogonPolicy,
        issuer: Arc<dyn TicketIssuer>,
        logon_path: &str,
        default_url: &str,
    ) -> Self {
        Self {
            policy,
            issuer,
            logon_path: logon_path.trim_matches('/').to_owned(),
            default_url: default_url.to_owned(),
        }
    }

    pub fn from_config(logon: &LogonConfig, ticket: &TicketConfig) -> Self {
        Self::new(
            LogonPolicy::from_config(logon),
            Arc::new(CookieTicketIssuer::new(ticket.clone())),
            &logon.logon_path,
            &logon.default_url,
        )
    }

    pub fn policy(&self) -> &LogonPolicy {
        &self.policy
    }

    /// Handle one request head. The logon path matches case-insensitively; HEAD is treated as GET.
    pub fn handle(&self, method: &Method, uri: &Uri) -> Response<Full<Bytes>> {
        let path = uri.path().trim_matches('/');
        if !path.eq_ignore_ascii_case(&self.logon_path) {
            return error_response(
                StatusCode::NOT_FOUND,
                &format!("route not found: {} {}", method, uri.path()),
            );
        }
        if *method != Method::GET && *method != Method::HEAD {
            return build(
                Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .header(ALLOW, "GET, HEAD"),
                Bytes::new(),
            );
        }

        let request = LogonRequest::from_query(uri.query());
        match self.policy.on_logon_request(&request) {
            LogonAction::RedirectAsAnonymous(principal) => {
                let redirect = match redirect_from_login_page(
                    self.issuer.as_ref(),
                    &principal,
                    false,
                    self.policy.return_url(&request),
                    &self.default_url,
                ) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "ticket issuance failed");
                        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
                    }
                };
                info!(%principal, location = %redirect.location, "anonymous logon");
                build(
                    Response::builder()
                        .status(StatusCode::FOUND)
                        .header(LOCATION, redirect.location.as_str())
                        .header(SET_COOKIE, redirect.ticket.set_cookie.as_str()),
                    Bytes::new(),
                )
            }
            LogonAction::ShowForm => build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "text/html; charset=utf-8"),
                Bytes::from_static(LOGON_FORM_HTML.as_bytes()),
            ),
        }
    }
}

fn build(builder: hyper::http::response::Builder, body: Bytes) -> Response<Full<Bytes>> {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        warn!(error = %e, "invalid response");
        let mut resp = Response::new(Full::new(Bytes::new()));
        *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        resp
    })
}

fn error_response(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": msg });
    build(
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json"),
        Bytes::from(body.to_string()),
    )
}

/// Accept loop until Ctrl-C. Each connection is served on its own task.
pub async fn serve(
    service: Arc<LogonService>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, path = %service.logon_path, "logon endpoint listening");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
            accept_result = listener.accept() => {
                let (stream, _) = match accept_result {
                    Ok(x) => x,
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = Arc::clone(&service);
                tokio::task::spawn(async move {
                    let svc = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let service = Arc::clone(&service);
                        async move { Ok::<_, Infallible>(service.handle(req.method(), req.uri())) }
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                        warn!(error = %e, "serve_connection error");
                    }
                });
            }
        }
    }
}

/// Run the server on a fresh multi-threaded runtime (blocks).
pub fn run(
    service: Arc<LogonService>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(service, host, port))
}
