//! Settings for the edgehub gateway.
//!
//! Layered loading (defaults, then an optional TOML file, then `EDGEHUB_`
//! environment variables), validation, and translation into the values the
//! core and upstream crates are built from. Also owns logging setup.

pub mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use edgehub_core::{
    AuthenticationPipeline, Authenticator, ConnectivityManager, ConnectivityPolicy,
    CredentialFactory, DeviceConnectivityManager, NullConnectivityManager,
};
use edgehub_upstream::{
    ProtocolOrder, ProxyConfig, StaticTokenProvider, TokenProvider, UpstreamProtocol,
    UpstreamSettings, UpstreamTarget,
};

pub use logging::{LogLevel, init_tracing};

/// Prefix for environment overrides. Nested keys use `__`:
/// `EDGEHUB_UPSTREAM__PROTOCOL=AmqpWs`.
pub const ENV_PREFIX: &str = "EDGEHUB_";

/// Module id the gateway runs as unless configured otherwise.
pub const DEFAULT_MODULE_ID: &str = "$edgeHub";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.to_string(),
    }
}

// ── Settings structs ────────────────────────────────────────────────

/// Top-level gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Upstream hub, e.g. `myhub.azure-devices.net`.
    pub hub_hostname: String,

    pub device_id: String,

    /// Empty means a device-scoped upstream connection.
    pub module_id: String,

    pub upstream: UpstreamSection,
    pub connectivity: ConnectivitySettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hub_hostname: String::new(),
            device_id: String::new(),
            module_id: DEFAULT_MODULE_ID.into(),
            upstream: UpstreamSection::default(),
            connectivity: ConnectivitySettings::default(),
            auth: AuthSettings::default(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Pinned protocol name. Unset or empty lets the gateway choose.
    pub protocol: Option<String>,

    /// HTTP(S) proxy URL. Falls back to the `https_proxy` variable.
    pub proxy: Option<String>,

    /// Prepended to the gateway's product identifier.
    pub product_info: Option<String>,

    /// Protocol names tried in order. Empty means the built-in order.
    pub fallback_order: Vec<String>,

    /// Pre-issued SAS token (never written back out).
    #[serde(skip_serializing)]
    pub sas_token: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectivitySettings {
    /// `false` wires in the no-op manager.
    pub enabled: bool,

    /// Consecutive timed-out calls before going offline.
    pub disconnect_threshold: u32,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disconnect_threshold: ConnectivityPolicy::DEFAULT_DISCONNECT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Accept requests carrying no credential as anonymous.
    pub allow_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "edgehub", "edgehub").map_or_else(
        || PathBuf::from("edgehub.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// The layered provider stack, exposed for inspection and tests.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(
            Env::raw()
                .only(&["https_proxy"])
                .map(|_| "upstream.proxy".into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate settings from `path` (missing file is fine) and the
/// environment.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = figment(path).extract()?;
    settings.validate()?;
    Ok(settings)
}

/// [`load_from`] the default [`config_path`].
pub fn load() -> Result<Settings, ConfigError> {
    load_from(&config_path())
}

/// Write settings as TOML. Secrets are not written.
pub fn save_to(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Settings {
    /// Check every field that has a constrained shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream_target()?;
        self.upstream_settings()?;
        self.connectivity_policy()?;
        self.log.level.parse::<LogLevel>()?;
        Ok(())
    }

    /// `None` when unset or blank.
    pub fn upstream_protocol(&self) -> Result<Option<UpstreamProtocol>, ConfigError> {
        match self.upstream.protocol.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name
                .parse()
                .map(Some)
                .map_err(|_| invalid("upstream.protocol", format!("unknown protocol '{name}'"))),
        }
    }

    pub fn fallback_order(&self) -> Result<ProtocolOrder, ConfigError> {
        if self.upstream.fallback_order.is_empty() {
            return Ok(ProtocolOrder::default());
        }
        ProtocolOrder::parse(self.upstream.fallback_order.as_slice())
            .map_err(|e| invalid("upstream.fallback_order", e))
    }

    pub fn proxy(&self) -> Result<Option<ProxyConfig>, ConfigError> {
        match self.upstream.proxy.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => ProxyConfig::parse(raw)
                .map(Some)
                .map_err(|e| invalid("upstream.proxy", e)),
        }
    }

    pub fn upstream_settings(&self) -> Result<UpstreamSettings, ConfigError> {
        let protocol = self.upstream_protocol()?;
        let fallback_order = self.fallback_order()?;
        Ok(UpstreamSettings {
            protocol,
            proxy: self.proxy()?,
            product_info: self.upstream.product_info.clone(),
            fallback_order,
        })
    }

    pub fn upstream_target(&self) -> Result<UpstreamTarget, ConfigError> {
        if self.hub_hostname.trim().is_empty() {
            return Err(invalid("hub_hostname", "must be set"));
        }
        if self.device_id.trim().is_empty() {
            return Err(invalid("device_id", "must be set"));
        }
        let module_id = Some(self.module_id.trim()).filter(|m| !m.is_empty());
        UpstreamTarget::new(&self.hub_hostname, self.device_id.trim(), module_id)
            .map_err(|e| invalid("upstream target", e))
    }

    pub fn connectivity_policy(&self) -> Result<ConnectivityPolicy, ConfigError> {
        if self.connectivity.disconnect_threshold == 0 {
            return Err(invalid("connectivity.disconnect_threshold", "must be at least 1"));
        }
        Ok(ConnectivityPolicy::new(self.connectivity.disconnect_threshold))
    }

    /// Hysteresis manager, or the no-op one when tracking is disabled.
    pub fn connectivity_manager(&self) -> Result<Arc<dyn ConnectivityManager>, ConfigError> {
        if !self.connectivity.enabled {
            return Ok(Arc::new(NullConnectivityManager::new()));
        }
        Ok(Arc::new(DeviceConnectivityManager::new(self.connectivity_policy()?)))
    }

    pub fn credential_factory(&self) -> CredentialFactory {
        CredentialFactory::new(self.hub_hostname.trim())
    }

    /// Pipeline over `authenticator`, honouring `auth.allow_anonymous`.
    pub fn authentication_pipeline<A: Authenticator>(
        &self,
        authenticator: Arc<A>,
    ) -> AuthenticationPipeline<A> {
        AuthenticationPipeline::new(authenticator, self.credential_factory())
            .with_anonymous(self.auth.allow_anonymous)
    }

    /// Token provider for a pre-issued SAS token, if one is configured.
    pub fn token_provider(&self) -> Option<Arc<dyn TokenProvider>> {
        use secrecy::ExposeSecret;

        self.upstream
            .sas_token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .map(|t| Arc::new(StaticTokenProvider::new(t.expose_secret())) as Arc<dyn TokenProvider>)
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.log.level.parse()
    }
}
