use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use edgehub_core::VerifiedIdentity;
use http::StatusCode;
use http::request::Parts;
use tracing::error;

/// Verified caller of the current request.
///
/// Only available behind the authentication middleware.
#[derive(Debug, Clone)]
pub struct Identity(pub VerifiedIdentity);

/// The route is not behind the authentication middleware.
#[derive(Debug, Clone, Copy)]
pub struct MissingIdentity;

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        error!("handler requires an identity but the route is not authenticated");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(Identity)
            .ok_or(MissingIdentity)
    }
}
