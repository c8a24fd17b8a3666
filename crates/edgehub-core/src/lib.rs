//! Connectivity and identity core of the edgehub gateway.
//!
//! - **[`connectivity`]**: folds upstream call outcomes into an
//!   online/offline verdict with hysteresis and notifies subscribers on each
//!   transition. [`NullConnectivityManager`] is the drop-in used when
//!   tracking is disabled.
//!
//! - **[`credentials`]**: [`CredentialFactory`] shapes raw request fields
//!   into a typed [`Credential`] (SAS token, X.509 chain, or anonymous).
//!
//! - **[`auth`]**: the [`Authenticator`] capability and the
//!   [`AuthenticationPipeline`] that extracts the claimed identity from a
//!   request, builds its credential, verifies it and attaches the resulting
//!   [`VerifiedIdentity`] to the request.

pub mod auth;
pub mod connectivity;
pub mod credentials;
pub mod error;
pub mod identity;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::{
    AuthOutcome, AuthStage, AuthenticationPipeline, Authenticator, AuthenticatorError, Rejection,
    RejectionReason,
};
pub use connectivity::{
    CallOutcome, ConnectivityEvent, ConnectivityHandler, ConnectivityManager, ConnectivityPolicy,
    ConnectivityState, DeviceConnectivityManager, NullConnectivityManager, SubscriptionId,
};
pub use credentials::{CertificateChain, Credential, CredentialFactory, CredentialMaterial};
pub use error::{CredentialError, PipelineFault, RejectionKind};
pub use identity::{AuthenticationScheme, ClaimedIdentity, VerifiedIdentity};
