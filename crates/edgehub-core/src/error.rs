// ── Core error types ──
//
// Credential construction errors and the authentication pipeline's two
// failure families: rejections (a normal negative verdict, surfaced as
// unauthorized) and faults (a system failure, surfaced as a server error).
// The two never convert into one another.

use thiserror::Error;

use crate::auth::RejectionReason;

/// Why a credential could not be built from the raw request fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("invalid {field}: {reason}")]
    InvalidIdentityFormat { field: &'static str, reason: String },

    #[error("SAS token is missing or empty")]
    MissingToken,

    #[error("SAS token is not valid header text")]
    MalformedToken,

    #[error("client certificate chain is empty")]
    EmptyCertificateChain,

    #[error("anonymous credentials are not allowed")]
    AnonymousNotAllowed,
}

impl CredentialError {
    pub fn is_invalid_identity(&self) -> bool {
        matches!(self, Self::InvalidIdentityFormat { .. })
    }
}

/// Why a request was turned away. Internal diagnostics only -- the network
/// caller sees [`Rejection::public_message`](crate::auth::Rejection::public_message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionKind {
    #[error("request does not carry an identity header")]
    MissingIdentityHeader,

    #[error("identity header is not of the form <deviceId>/<moduleId>")]
    MalformedIdentityHeader,

    #[error("request carries neither a SAS token nor a client certificate")]
    MissingCredentials,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("authenticator rejected the credential: {0}")]
    Rejected(RejectionReason),
}

/// Unexpected failure while verifying a credential.
#[derive(Debug, Error)]
pub enum PipelineFault {
    #[error("authenticator failed while verifying {identity}: {source}")]
    Authenticator {
        identity: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("authenticator panicked while verifying {identity}: {message}")]
    Panicked { identity: String, message: String },
}

impl PipelineFault {
    /// Identity (`device` or `device/module`) that was being verified.
    pub fn identity(&self) -> &str {
        match self {
            Self::Authenticator { identity, .. } | Self::Panicked { identity, .. } => identity,
        }
    }
}
