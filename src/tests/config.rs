use std::str::FromStr;

use crate::config::{ConfigFile, ServerConfig};
use crate::enums::BindingMode;
use crate::registration::ActiveServer;
use crate::{LWM2M_VERSION, SSID_BOOTSTRAP};

const TEST_CONFIG: &str = r#"{
    "endpoint_name": "urn:dev:os:goat-0001",
    "lifetime": 600,
    "binding": "UQ",
    "servers": [
        {"ssid": 1, "uri": "coaps://lwm2m.example.goat:5684"},
        {"ssid": 2, "uri": "coap://bootstrap.example.goat", "bootstrap": true}
    ]
}"#;

#[test]
fn test_config_from_str() {
    let config = ConfigFile::from_str(TEST_CONFIG).expect("the config should parse");
    assert_eq!(config.endpoint_name, "urn:dev:os:goat-0001");
    assert_eq!(config.lifetime, 600);
    assert_eq!(config.binding, BindingMode::UQ);
    // unset fields come out as the defaults
    assert_eq!(config.lwm2m_version, LWM2M_VERSION);
    assert_eq!(config.log_level, "INFO");
    assert_eq!(config.sms_msisdn, None);
    assert_eq!(config.servers.len(), 2);
    assert!(config.servers[1].bootstrap);
    config.check_config().expect("the config should validate");
}

#[test]
fn test_config_check_catches_problems() {
    let config = ConfigFile {
        lifetime: 0,
        servers: vec![
            ServerConfig {
                ssid: 0,
                uri: "coap://h".to_string(),
                bootstrap: false,
            },
            ServerConfig {
                ssid: 3,
                uri: "http://nope".to_string(),
                bootstrap: false,
            },
            ServerConfig {
                ssid: 3,
                uri: "coap://user@h".to_string(),
                bootstrap: false,
            },
        ],
        ..ConfigFile::default()
    };

    let errors = config.check_config().expect_err("the config is broken");
    // non-positive lifetime, reserved SSID, unsupported scheme, duplicate
    // SSID, and the credentialed URI
    assert_eq!(errors.len(), 5, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("lifetime")));
    assert!(errors.iter().any(|e| e.contains("SSID 0 is reserved")));
    assert!(errors.iter().any(|e| e.contains("Unsupported scheme")));
    assert!(errors.iter().any(|e| e.contains("Duplicate SSID 3")));
    assert!(errors.iter().any(|e| e.contains("credentials")));
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("goatm2m.json");
    std::fs::write(&path, TEST_CONFIG).expect("write config");

    let path_string = path.display().to_string();
    let config = ConfigFile::try_from(Some(&path_string)).expect("the config should load");
    assert_eq!(config.lifetime, 600);
    assert_eq!(config.endpoint_name, "urn:dev:os:goat-0001");
}

#[test]
fn test_missing_config_file_errors() {
    let path = "/nonexistent/goatm2m.json".to_string();
    assert!(ConfigFile::try_from(Some(&path)).is_err());
}

#[test]
fn test_active_server_from_config() {
    let config = ConfigFile::from_str(TEST_CONFIG).expect("the config should parse");

    let server =
        ActiveServer::from_config(&config.servers[0], &config).expect("should build");
    assert_eq!(server.ssid, 1);
    assert_eq!(server.params.lifetime_s, 600);
    assert_eq!(server.params.binding, BindingMode::UQ);
    assert!(server.registration.conn_type.is_none());
    assert!(server.update_handle.is_none());

    let bootstrap =
        ActiveServer::from_config(&config.servers[1], &config).expect("should build");
    assert_eq!(bootstrap.ssid, SSID_BOOTSTRAP);
    assert!(bootstrap.is_bootstrap());

    let bad = ServerConfig {
        ssid: 9,
        uri: "http://nope".to_string(),
        bootstrap: false,
    };
    assert!(ActiveServer::from_config(&bad, &config).is_err());
}

#[test]
fn test_config_display_and_json() {
    let config = ConfigFile::default();
    let rendered = format!("{config}");
    assert!(rendered.contains("lifetime=86400s"), "{rendered}");
    assert!(rendered.contains("binding=U"), "{rendered}");
    assert!(
        config
            .as_json_pretty()
            .expect("should serialize")
            .contains("endpoint_name")
    );
}
