//! Inbound request authentication.
//!
//! Defines the [`Authenticator`] capability consumed by the gateway and the
//! [`AuthenticationPipeline`] that turns an HTTP request into a
//! [`VerifiedIdentity`](crate::identity::VerifiedIdentity).

mod pipeline;

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::credentials::Credential;
use crate::identity::VerifiedIdentity;

pub use pipeline::{
    AUTHORIZATION_HEADER, AuthOutcome, AuthStage, AuthenticationPipeline, IDENTITY_HEADER,
    Rejection, UNAUTHORIZED_MESSAGE,
};

/// Negative verdict from an authenticator, with a caller-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason {
    message: String,
}

impl RejectionReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Error returned by an [`Authenticator`].
#[derive(Debug, Error)]
pub enum AuthenticatorError {
    /// The credential is not acceptable. A normal outcome.
    #[error("credential rejected: {0}")]
    Rejected(RejectionReason),

    /// The authenticator could not reach a verdict (store down, crypto error, ...).
    #[error("authenticator failure: {0}")]
    Fault(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthenticatorError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(RejectionReason::new(message))
    }

    pub fn fault(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Fault(err.into())
    }
}

/// Verifies client credentials.
///
/// Implementations must handle every
/// [`CredentialMaterial`](crate::credentials::CredentialMaterial) variant
/// explicitly; an unrecognised scheme is a rejection, never a silent accept.
/// Uses RPITIT, so pipelines are generic over the authenticator rather than
/// boxing it.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<VerifiedIdentity, AuthenticatorError>> + Send;
}
