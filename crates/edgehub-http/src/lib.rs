//! HTTP boundary for the edgehub authentication pipeline.
//!
//! [`with_authentication`] wraps an axum [`Router`](axum::Router) so every
//! request is run through an
//! [`AuthenticationPipeline`](edgehub_core::AuthenticationPipeline) before
//! it reaches a handler. Handlers read the caller with the [`Identity`]
//! extractor.
//!
//! | pipeline result | response                                    |
//! |-----------------|---------------------------------------------|
//! | authenticated   | forwarded, `VerifiedIdentity` in extensions |
//! | unauthorized    | `401`, plain-text public message            |
//! | fault           | `500`, [`AuthFaultMarker`] in extensions    |

mod extract;
mod middleware;

pub use extract::{Identity, MissingIdentity};
pub use middleware::{AuthFault, AuthFaultMarker, authenticate, with_authentication};
