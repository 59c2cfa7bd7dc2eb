//! Extension wiring: config -> discovery adapter + logon endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reportauth_core::{
    DiscoveryConfig, DiscoveryError, DiscoveryErrorKind, Inventory, Namespace, ServiceDiscovery,
    ServiceInstanceRecord,
};
use reportauth_rs::{Config, DiscoveryModule, Extension, ExtensionError, HostLocator, ResolvedEndpoint};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("reportauth-{}-{}.json", name, std::process::id()))
}

#[tokio::test]
async fn static_url_skips_management_query() {
    let config = Config::from_json(
        r#"{ "discovery": { "report_server_url": "https://bi.example/ReportServer" } }"#,
    )
    .unwrap();
    let ext = Extension::from_config(config).unwrap();
    let url = ext.report_server_url().await.unwrap();
    assert_eq!(url.base_url(), "https://bi.example/ReportServer/ReportService2010.asmx");
}

#[tokio::test]
async fn inventory_file_backs_discovery() {
    let path = temp_path("inventory");
    let snapshot = serde_json::json!({
        "namespaces": {
            r"\\REPORTS01\root\Microsoft\SqlServer\ReportServer\RS_MSSQLSERVER\v11": {
                "classes": {
                    "MSReportServer_Instance": [{
                        "properties": { "InstanceName": "MSSQLSERVER" },
                        "methods": { "GetReportServerUrls": {
                            "ApplicationName": ["ReportServerWebService"],
                            "URLs": ["http://reports01:80/ReportServer"]
                        }}
                    }]
                }
            }
        }
    });
    std::fs::write(&path, snapshot.to_string()).unwrap();

    let mut config = Config::default();
    config.discovery.machine_name = "REPORTS01".to_owned();
    config.inventory = Some(path.clone());
    let ext = Extension::from_config(config).unwrap();
    std::fs::remove_file(&path).unwrap();

    let url = ext.report_server_url().await.unwrap();
    assert_eq!(url.base_url(), "http://reports01:80/ReportServer/ReportService2010.asmx");

    let err = ext
        .resolve(&HostLocator::new("REPORTS01", "RS_OTHER"))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DiscoveryErrorKind::Connection { .. }));
}

#[test]
fn missing_discovery_source_is_an_error() {
    let err = Extension::from_config(Config::default()).err().unwrap();
    assert!(matches!(err, ExtensionError::NoManagementQuery));

    let mut config = Config::default();
    config.inventory = Some(temp_path("does-not-exist"));
    let err = Extension::from_config(config).err().unwrap();
    assert!(matches!(err, ExtensionError::Core(reportauth_rs::CoreError::Io(_))));
}

#[tokio::test]
async fn management_module_with_in_memory_inventory() {
    let cfg = DiscoveryConfig {
        machine_name: "HOST".to_owned(),
        instance_name: "RS_SSRS".to_owned(),
        ..DiscoveryConfig::default()
    };
    let inv = Inventory::new().namespace(
        r"\\HOST\root\Microsoft\SqlServer\ReportServer\RS_SSRS\v11",
        Namespace::new().class(
            "MSReportServer_Instance",
            vec![ServiceInstanceRecord::new("SSRS")
                .endpoint("ReportServerWebService", "http://host/ReportServer")
                .to_instance(&cfg)],
        ),
    );
    let mut config = Config::default();
    config.discovery = cfg.clone();
    let ext = Extension::new(config, DiscoveryModule::new().management(Arc::new(inv), cfg)).unwrap();
    assert_eq!(
        ext.report_server_url().await.unwrap().to_string(),
        "http://host/ReportServer/ReportService2010.asmx"
    );
}

struct Unreachable;

#[async_trait]
impl ServiceDiscovery for Unreachable {
    async fn resolve(&self, locator: &HostLocator) -> Result<ResolvedEndpoint, DiscoveryError> {
        Err(DiscoveryError::new(
            locator,
            DiscoveryErrorKind::Connection {
                namespace: "n/a".to_owned(),
            },
            None,
        ))
    }
}

#[tokio::test]
async fn custom_adapter_and_logon_are_independent() {
    let ext = Extension::new(Config::default(), DiscoveryModule::new().adapter(Unreachable)).unwrap();
    assert!(ext.report_server_url().await.is_err());
    assert_eq!(ext.locator(), HostLocator::new("localhost", "RS_MSSQLSERVER"));
    assert_eq!(ext.logon().policy().anonymous_principal().as_str(), "Anonymous");
}

#[test]
fn empty_module_is_rejected() {
    let err = Extension::new(Config::default(), DiscoveryModule::default()).err().unwrap();
    assert!(matches!(err, ExtensionError::NoManagementQuery));
}
