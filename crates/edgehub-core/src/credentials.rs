// ── Client credentials ──
//
// Typed, unverified bundles of identity-proving material. The factory
// only shapes raw request fields into a `Credential`; verification is the
// authenticator's job.

use secrecy::SecretString;
use uuid::Uuid;

use crate::error::CredentialError;
use crate::identity::{AuthenticationScheme, ClaimedIdentity};

/// DER-encoded client certificate chain, leaf first.
///
/// TLS listeners insert this into the request extensions after the
/// handshake; the authentication pipeline picks it up from there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificateChain(Vec<Vec<u8>>);

impl CertificateChain {
    pub fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self(certificates)
    }

    pub fn leaf(&self) -> Option<&[u8]> {
        self.0.first().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }
}

/// The identity-proving part of a credential.
///
/// Each variant carries the material needed for its scheme. The token is a
/// `SecretString` so it never shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub enum CredentialMaterial {
    SasToken { token: SecretString },
    Certificate { chain: CertificateChain },
    Anonymous,
}

impl CredentialMaterial {
    pub fn scheme(&self) -> AuthenticationScheme {
        match self {
            Self::SasToken { .. } => AuthenticationScheme::SasToken,
            Self::Certificate { .. } => AuthenticationScheme::X509Certificate,
            Self::Anonymous => AuthenticationScheme::Anonymous,
        }
    }
}

/// Credential for one authentication attempt. Immutable once built.
#[derive(Debug, Clone)]
pub struct Credential {
    identity: ClaimedIdentity,
    hub_hostname: String,
    request_id: Uuid,
    material: CredentialMaterial,
}

impl Credential {
    pub fn identity(&self) -> &ClaimedIdentity {
        &self.identity
    }

    pub fn hub_hostname(&self) -> &str {
        &self.hub_hostname
    }

    /// Correlates log lines for this attempt.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn material(&self) -> &CredentialMaterial {
        &self.material
    }

    pub fn scheme(&self) -> AuthenticationScheme {
        self.material.scheme()
    }
}

// ── CredentialFactory ───────────────────────────────────────────────

/// Builds credentials scoped to one upstream hub.
#[derive(Debug, Clone)]
pub struct CredentialFactory {
    hub_hostname: String,
}

impl CredentialFactory {
    pub fn new(hub_hostname: impl Into<String>) -> Self {
        Self {
            hub_hostname: hub_hostname.into(),
        }
    }

    pub fn hub_hostname(&self) -> &str {
        &self.hub_hostname
    }

    /// SAS token credential.
    ///
    /// A blank token is `MissingToken`, unless `allow_anonymous` is set, in
    /// which case an anonymous credential is returned instead.
    pub fn build_from_token(
        &self,
        device_id: &str,
        module_id: &str,
        token: &str,
        request_id: Uuid,
        allow_anonymous: bool,
    ) -> Result<Credential, CredentialError> {
        if token.trim().is_empty() {
            return if allow_anonymous {
                self.build_anonymous(device_id, module_id, request_id, true)
            } else {
                Err(CredentialError::MissingToken)
            };
        }

        let token = SecretString::from(token.to_owned());
        self.build(device_id, module_id, request_id, CredentialMaterial::SasToken { token })
    }

    /// X.509 client certificate credential.
    pub fn build_from_certificate(
        &self,
        device_id: &str,
        module_id: &str,
        chain: CertificateChain,
        request_id: Uuid,
    ) -> Result<Credential, CredentialError> {
        if chain.is_empty() {
            return Err(CredentialError::EmptyCertificateChain);
        }
        self.build(device_id, module_id, request_id, CredentialMaterial::Certificate { chain })
    }

    /// Credential with no proof attached, for pre-authenticated internal
    /// callers. Refused unless the caller passes `allowed = true`.
    pub fn build_anonymous(
        &self,
        device_id: &str,
        module_id: &str,
        request_id: Uuid,
        allowed: bool,
    ) -> Result<Credential, CredentialError> {
        if !allowed {
            return Err(CredentialError::AnonymousNotAllowed);
        }
        self.build(device_id, module_id, request_id, CredentialMaterial::Anonymous)
    }

    fn build(
        &self,
        device_id: &str,
        module_id: &str,
        request_id: Uuid,
        material: CredentialMaterial,
    ) -> Result<Credential, CredentialError> {
        Ok(Credential {
            identity: ClaimedIdentity::new(device_id, module_id)?,
            hub_hostname: self.hub_hostname.clone(),
            request_id,
            material,
        })
    }
}
