// ── Client identity types ──
//
// `ClaimedIdentity` is what a request says it is; `VerifiedIdentity` is
// what an authenticator vouched for. Only the latter ever reaches routing.

use std::fmt;

use crate::error::CredentialError;

/// Longest device or module id accepted by the upstream hub.
pub const MAX_ID_LEN: usize = 128;

/// Which credential scheme produced an identity.
///
/// Marker enum (no data) -- the secret material lives in
/// [`CredentialMaterial`](crate::credentials::CredentialMaterial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum AuthenticationScheme {
    SasToken,
    X509Certificate,
    Anonymous,
}

// ── ClaimedIdentity ─────────────────────────────────────────────────

/// Device (and optionally module) a request claims to act as. Untrusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimedIdentity {
    device_id: String,
    module_id: Option<String>,
}

impl ClaimedIdentity {
    /// Validate and build. An empty `module_id` means a device-scoped identity.
    pub fn new(device_id: &str, module_id: &str) -> Result<Self, CredentialError> {
        validate_id("device id", device_id)?;
        let module_id = if module_id.is_empty() {
            None
        } else {
            validate_id("module id", module_id)?;
            Some(module_id.to_owned())
        };

        Ok(Self {
            device_id: device_id.to_owned(),
            module_id,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    pub fn is_module(&self) -> bool {
        self.module_id.is_some()
    }

    /// Canonical id: `device` or `device/module`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClaimedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module_id {
            Some(module) => write!(f, "{}/{module}", self.device_id),
            None => f.write_str(&self.device_id),
        }
    }
}

fn validate_id(field: &'static str, value: &str) -> Result<(), CredentialError> {
    let invalid = |reason: &str| CredentialError::InvalidIdentityFormat {
        field,
        reason: reason.to_owned(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(invalid(&format!("longer than {MAX_ID_LEN} characters")));
    }
    if value.contains(['/', '\\']) {
        return Err(invalid("must not contain path separators"));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("must not contain whitespace or control characters"));
    }
    Ok(())
}

// ── VerifiedIdentity ────────────────────────────────────────────────

/// Identity vouched for by an [`Authenticator`](crate::auth::Authenticator).
///
/// Lives in the request's extensions for the rest of that request and is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    identity: ClaimedIdentity,
    hub_hostname: String,
    scheme: AuthenticationScheme,
}

impl VerifiedIdentity {
    pub fn new(identity: ClaimedIdentity, hub_hostname: impl Into<String>, scheme: AuthenticationScheme) -> Self {
        Self {
            identity,
            hub_hostname: hub_hostname.into(),
            scheme,
        }
    }

    pub fn device_id(&self) -> &str {
        self.identity.device_id()
    }

    pub fn module_id(&self) -> Option<&str> {
        self.identity.module_id()
    }

    pub fn id(&self) -> String {
        self.identity.id()
    }

    pub fn hub_hostname(&self) -> &str {
        &self.hub_hostname
    }

    pub fn scheme(&self) -> AuthenticationScheme {
        self.scheme
    }
}

impl fmt::Display for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.hub_hostname)
    }
}
