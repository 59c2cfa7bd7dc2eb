//! Config parsing and defaults.

use std::io::Write;
use std::time::Duration;

use reportauth_core::{Config, CoreError};

#[test]
fn empty_document_uses_defaults() {
    let cfg = Config::from_json("{}").unwrap();
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 8000);
    assert_eq!(
        cfg.discovery.namespace_template,
        r"\root\Microsoft\SqlServer\ReportServer\{0}\v11"
    );
    assert_eq!(cfg.discovery.service_application_name, "ReportServerWebService");
    assert_eq!(cfg.discovery.service_path_suffix, "/ReportService2010.asmx");
    assert_eq!(cfg.discovery.instance_name_prefix, "RS_");
    assert_eq!(cfg.discovery.connect_timeout(), None);
    assert!(cfg.logon.anonymous_only);
    assert_eq!(cfg.ticket.cookie_name, "sqlAuthCookie");
    assert!(cfg.inventory.is_none());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let cfg = Config::from_json(
        r#"{
            "discovery": { "machine_name": "REPORTS01", "connect_timeout_ms": 1500 },
            "logon": { "anonymous_only": false, "anonymous_principal": "Guest" }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.discovery.machine_name, "REPORTS01");
    assert_eq!(cfg.discovery.instance_name, "RS_MSSQLSERVER");
    assert_eq!(cfg.discovery.connect_timeout(), Some(Duration::from_millis(1500)));
    assert!(!cfg.logon.anonymous_only);
    assert_eq!(cfg.logon.anonymous_principal, "Guest");
    assert_eq!(cfg.logon.return_url_param, "ReturnUrl");
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Config::from_json(r#"{ "logon": { "anonymousOnly": true } }"#).unwrap_err();
    assert!(matches!(err, CoreError::Json(_)));
}

#[test]
fn load_from_file() {
    let path = std::env::temp_dir().join(format!("reportauth-config-{}.json", std::process::id()));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(br#"{ "server": { "port": 9090 }, "inventory": "hosts.json" }"#)
        .unwrap();
    drop(f);
    let cfg = Config::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(cfg.server.port, 9090);
    assert_eq!(cfg.inventory.as_deref(), Some(std::path::Path::new("hosts.json")));

    let missing = Config::load(&path).unwrap_err();
    assert!(matches!(missing, CoreError::Io(_)));
}

#[test]
fn host_and_port_env_override_file() {
    let mut cfg = Config::from_json(r#"{ "server": { "host": "10.0.0.5", "port": 8080 } }"#).unwrap();
    std::env::set_var("HOST", "0.0.0.0");
    std::env::set_var("PORT", "9443");
    let applied = cfg.apply_env();
    std::env::set_var("PORT", "notaport");
    let bad_port = cfg.clone().apply_env();
    std::env::remove_var("HOST");
    std::env::remove_var("PORT");

    applied.unwrap();
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9443);
    assert!(matches!(bad_port, Err(CoreError::Config(ref msg)) if msg.contains("notaport")));
}
