//! Integration tests for layered settings loading.
//!
//! File-only cases use a temp directory; environment overrides run inside
//! `figment::Jail` so variables never leak between tests.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use edgehub_config::{ConfigError, LogLevel, Settings, figment, load_from, save_to};
use edgehub_core::{
    AuthenticationPipeline, Authenticator, AuthenticatorError, ConnectivityState, Credential,
    VerifiedIdentity,
};
use edgehub_upstream::{ProtocolOrder, UpstreamProtocol};
use pretty_assertions::assert_eq;

// ── Helpers ─────────────────────────────────────────────────────────

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

struct RejectAll;

impl Authenticator for RejectAll {
    async fn authenticate(&self, _credential: &Credential) -> Result<VerifiedIdentity, AuthenticatorError> {
        Err(AuthenticatorError::rejected("no"))
    }
}

// ── File layering ───────────────────────────────────────────────────

#[test]
fn test_file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
hub_hostname = "myhub.azure-devices.net"
device_id = "edge-1"

[upstream]
protocol = "amqpws"
product_info = "acme-gw/2.0"
fallback_order = ["MqttWs", "AmqpWs"]

[connectivity]
disconnect_threshold = 5

[log]
level = "warning"
json = true
"#,
    );

    let settings: Settings = figment(&path).extract().unwrap();
    settings.validate().unwrap();

    assert_eq!(settings.module_id, "$edgeHub");
    assert_eq!(settings.upstream_protocol().unwrap(), Some(UpstreamProtocol::AmqpWs));
    assert_eq!(
        settings.fallback_order().unwrap(),
        ProtocolOrder::new(vec![UpstreamProtocol::MqttWs, UpstreamProtocol::AmqpWs]).unwrap()
    );
    assert_eq!(settings.connectivity_policy().unwrap().disconnect_threshold.get(), 5);
    assert_eq!(settings.log_level().unwrap(), LogLevel::Warn);
    assert!(settings.log.json);

    let upstream = settings.upstream_settings().unwrap();
    assert_eq!(upstream.product_info.as_deref(), Some("acme-gw/2.0"));
    assert_eq!(
        settings.upstream_target().unwrap().to_string(),
        "edge-1/$edgeHub@myhub.azure-devices.net"
    );
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
hub_hostname = "myhub.azure-devices.net"
device_id = "edge-1"

[upstream]
fallback_order = ["Amqp", "Amqp"]
"#,
    );

    let err = load_from(&path).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation { ref field, .. } if field == "upstream.fallback_order"),
        "{err}"
    );
}

#[test]
fn test_malformed_toml_is_a_loading_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "hub_hostname = [unterminated");

    assert!(matches!(load_from(&path), Err(ConfigError::Figment(_))));
}

#[test]
fn test_saved_settings_reload_without_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut settings = Settings {
        hub_hostname: "myhub.azure-devices.net".into(),
        device_id: "edge-1".into(),
        ..Settings::default()
    };
    settings.upstream.sas_token = Some(secrecy::SecretString::from("sig=abc".to_owned()));
    settings.connectivity.enabled = false;
    save_to(&settings, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(!written.contains("sig=abc"));

    let reloaded: Settings = figment(&path).extract().unwrap();
    assert_eq!(reloaded.hub_hostname, "myhub.azure-devices.net");
    assert!(!reloaded.connectivity.enabled);
    assert!(reloaded.upstream.sas_token.is_none());
}

// ── Environment overrides ───────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
hub_hostname = "file-hub.azure-devices.net"
device_id = "edge-1"

[upstream]
protocol = "Amqp"
"#,
        )?;
        jail.set_env("EDGEHUB_HUB_HOSTNAME", "env-hub.azure-devices.net");
        jail.set_env("EDGEHUB_UPSTREAM__PROTOCOL", "MqttWs");
        jail.set_env("EDGEHUB_CONNECTIVITY__ENABLED", "false");
        jail.set_env("EDGEHUB_AUTH__ALLOW_ANONYMOUS", "true");

        let settings = load_from(&jail.directory().join("config.toml")).unwrap();

        assert_eq!(settings.hub_hostname, "env-hub.azure-devices.net");
        assert_eq!(settings.upstream_protocol().unwrap(), Some(UpstreamProtocol::MqttWs));
        assert_eq!(
            settings.connectivity_manager().unwrap().state(),
            ConnectivityState::Online
        );
        let pipeline: AuthenticationPipeline<RejectAll> =
            settings.authentication_pipeline(Arc::new(RejectAll));
        assert!(pipeline.allows_anonymous());
        Ok(())
    });
}

#[test]
fn test_https_proxy_variable_is_honoured() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("EDGEHUB_HUB_HOSTNAME", "hub.azure-devices.net");
        jail.set_env("EDGEHUB_DEVICE_ID", "edge-1");
        jail.set_env("https_proxy", "http://user:pw@proxy.local:3128");

        let settings = load_from(&jail.directory().join("absent.toml")).unwrap();
        let proxy = settings.proxy().unwrap().unwrap();

        assert_eq!(proxy.url().as_str(), "http://proxy.local:3128/");
        assert_eq!(proxy.username(), Some("user"));
        Ok(())
    });
}

#[test]
fn test_explicit_proxy_beats_https_proxy_variable() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("EDGEHUB_HUB_HOSTNAME", "hub.azure-devices.net");
        jail.set_env("EDGEHUB_DEVICE_ID", "edge-1");
        jail.set_env("https_proxy", "http://ambient.local:3128");
        jail.set_env("EDGEHUB_UPSTREAM__PROXY", "http://explicit.local:8080");

        let settings = load_from(&jail.directory().join("absent.toml")).unwrap();

        assert_eq!(
            settings.proxy().unwrap().unwrap().url().host_str(),
            Some("explicit.local")
        );
        Ok(())
    });
}
