// ── Authentication pipeline ──
//
// Per request: Start -> IdentityExtracted -> CredentialBuilt -> Verified | rejected.
// Every rejection collapses into one unauthorized outcome for the caller;
// which step failed is only logged. Authenticator faults (errors or
// panics) are kept apart and returned as `PipelineFault`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::{HeaderMap, Request};
use tracing::{debug, error};
use uuid::Uuid;

use super::{Authenticator, AuthenticatorError};
use crate::credentials::{CertificateChain, Credential, CredentialFactory};
use crate::error::{CredentialError, PipelineFault, RejectionKind};
use crate::identity::VerifiedIdentity;

/// Header carrying `<deviceId>/<moduleId>`.
pub const IDENTITY_HEADER: &str = "x-ms-edge-moduleid";

/// Header carrying the SAS token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Body sent for every rejection that did not come from the authenticator.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Where in the pipeline a request was when it was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AuthStage {
    Start,
    IdentityExtracted,
    CredentialBuilt,
    Verified,
}

/// A request that failed authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    kind: RejectionKind,
    stage: AuthStage,
    request_id: Uuid,
}

impl Rejection {
    /// What actually went wrong. For diagnostics, never for the network caller.
    pub fn kind(&self) -> &RejectionKind {
        &self.kind
    }

    /// Last stage reached before the rejection.
    pub fn stage(&self) -> AuthStage {
        self.stage
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Message safe to return to the caller.
    ///
    /// Authenticator verdicts carry their own message; every step-level
    /// failure maps to the same generic text so the boundary cannot be
    /// probed step by step.
    pub fn public_message(&self) -> &str {
        match &self.kind {
            RejectionKind::Rejected(reason) => reason.message(),
            RejectionKind::MissingIdentityHeader
            | RejectionKind::MalformedIdentityHeader
            | RejectionKind::MissingCredentials
            | RejectionKind::Credential(_) => UNAUTHORIZED_MESSAGE,
        }
    }
}

/// Terminal state of a non-faulting pipeline run.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(VerifiedIdentity),
    Unauthorized(Rejection),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// ── AuthenticationPipeline ──────────────────────────────────────────

/// Turns inbound requests into verified identities.
///
/// Cheap to share behind an `Arc`; holds no per-request state and no lock
/// across the authenticator call.
pub struct AuthenticationPipeline<A> {
    authenticator: Arc<A>,
    factory: CredentialFactory,
    allow_anonymous: bool,
}

impl<A: Authenticator> AuthenticationPipeline<A> {
    pub fn new(authenticator: Arc<A>, factory: CredentialFactory) -> Self {
        Self {
            authenticator,
            factory,
            allow_anonymous: false,
        }
    }

    /// Accept requests with no credential material as anonymous.
    ///
    /// Only for listeners reachable by pre-authenticated internal callers.
    pub fn with_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }

    pub fn allows_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Run the pipeline for one request.
    ///
    /// On success the [`VerifiedIdentity`] is inserted into the request's
    /// extensions before returning.
    pub async fn authenticate<B>(&self, request: &mut Request<B>) -> Result<AuthOutcome, PipelineFault> {
        let request_id = Uuid::new_v4();

        let (device_id, module_id) = match extract_identity(request.headers()) {
            Ok(parts) => parts,
            Err(kind) => return Ok(reject(kind, AuthStage::Start, request_id)),
        };

        let credential = match self.build_credential(request, &device_id, &module_id, request_id) {
            Ok(credential) => credential,
            Err(kind) => return Ok(reject(kind, AuthStage::IdentityExtracted, request_id)),
        };

        let identity = credential.identity().id();
        let verdict = AssertUnwindSafe(self.authenticator.authenticate(&credential))
            .catch_unwind()
            .await;

        match verdict {
            Ok(Ok(verified)) => {
                debug!(
                    %request_id,
                    stage = %AuthStage::Verified,
                    identity = %verified,
                    scheme = %verified.scheme(),
                    "http authentication succeeded"
                );
                request.extensions_mut().insert(verified.clone());
                Ok(AuthOutcome::Authenticated(verified))
            }
            Ok(Err(AuthenticatorError::Rejected(reason))) => Ok(reject(
                RejectionKind::Rejected(reason),
                AuthStage::CredentialBuilt,
                request_id,
            )),
            Ok(Err(AuthenticatorError::Fault(source))) => {
                error!(%request_id, %identity, error = %source, "authenticator failed");
                Err(PipelineFault::Authenticator { identity, source })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%request_id, %identity, panic = %message, "authenticator panicked");
                Err(PipelineFault::Panicked { identity, message })
            }
        }
    }

    /// Pick the scheme from what the request carries: token, then client
    /// certificate, then anonymous if allowed.
    ///
    /// A present `Authorization` header always means a token attempt; an
    /// unreadable or blank value is rejected, never downgraded.
    fn build_credential<B>(
        &self,
        request: &Request<B>,
        device_id: &str,
        module_id: &str,
        request_id: Uuid,
    ) -> Result<Credential, RejectionKind> {
        let credential = if let Some(value) = request.headers().get(AUTHORIZATION_HEADER) {
            let token = value.to_str().map_err(|_| CredentialError::MalformedToken)?;
            self.factory
                .build_from_token(device_id, module_id, token.trim(), request_id, false)?
        } else if let Some(chain) = request.extensions().get::<CertificateChain>() {
            self.factory
                .build_from_certificate(device_id, module_id, chain.clone(), request_id)?
        } else if self.allow_anonymous {
            self.factory
                .build_anonymous(device_id, module_id, request_id, true)?
        } else {
            return Err(RejectionKind::MissingCredentials);
        };

        Ok(credential)
    }
}

/// Split the identity header into `(device_id, module_id)`.
///
/// Exactly one `/` with non-empty text on both sides is accepted.
fn extract_identity(headers: &HeaderMap) -> Result<(String, String), RejectionKind> {
    let value = headers
        .get(IDENTITY_HEADER)
        .ok_or(RejectionKind::MissingIdentityHeader)?;
    if value.is_empty() {
        return Err(RejectionKind::MissingIdentityHeader);
    }

    let value = value
        .to_str()
        .map_err(|_| RejectionKind::MalformedIdentityHeader)?;

    match value.split('/').collect::<Vec<_>>().as_slice() {
        [device, module] if !device.is_empty() && !module.is_empty() => {
            Ok(((*device).to_owned(), (*module).to_owned()))
        }
        _ => Err(RejectionKind::MalformedIdentityHeader),
    }
}

fn reject(kind: RejectionKind, stage: AuthStage, request_id: Uuid) -> AuthOutcome {
    debug!(%request_id, %stage, reason = %kind, "http authentication failed");
    AuthOutcome::Unauthorized(Rejection {
        kind,
        stage,
        request_id,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
