//! Integration tests for the axum authentication middleware.
//!
//! Each test drives a small router through `tower::ServiceExt::oneshot`
//! with an authenticator whose verdict is keyed on the presented token.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::response::Response;
use axum::routing::get;
use edgehub_core::auth::{AUTHORIZATION_HEADER, IDENTITY_HEADER};
use edgehub_core::{
    AuthenticationPipeline, Authenticator, AuthenticatorError, Credential, CredentialFactory,
    CredentialMaterial, VerifiedIdentity,
};
use edgehub_http::{AuthFaultMarker, Identity, with_authentication};
use http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use tower::ServiceExt;

// ── Token-keyed authenticator ───────────────────────────────────────

struct TokenTable;

impl Authenticator for TokenTable {
    async fn authenticate(&self, credential: &Credential) -> Result<VerifiedIdentity, AuthenticatorError> {
        let CredentialMaterial::SasToken { token } = credential.material() else {
            return Err(AuthenticatorError::rejected("only SAS tokens are accepted"));
        };
        match token.expose_secret() {
            "good" => Ok(VerifiedIdentity::new(
                credential.identity().clone(),
                credential.hub_hostname(),
                credential.scheme(),
            )),
            "boom" => Err(AuthenticatorError::fault("identity store unreachable")),
            _ => Err(AuthenticatorError::rejected("token expired")),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn whoami(Identity(identity): Identity) -> String {
    identity.id()
}

fn app() -> Router {
    let pipeline = Arc::new(AuthenticationPipeline::new(
        Arc::new(TokenTable),
        CredentialFactory::new("hub.example.net"),
    ));
    with_authentication(Router::new().route("/whoami", get(whoami)), pipeline)
}

fn request(identity: Option<&str>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &Response) -> &str {
    response.headers()[header::CONTENT_TYPE].to_str().unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticated_request_reaches_handler() {
    let response = app()
        .oneshot(request(Some("dev1/mod1"), Some("good")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "dev1/mod1");
}

#[tokio::test]
async fn test_malformed_header_is_unauthorized() {
    let response = app()
        .oneshot(request(Some("dev1"), Some("good")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(content_type(&response), "text/plain; charset=utf-8");
    assert_eq!(body_text(response).await, "Unauthorized");
}

#[tokio::test]
async fn test_missing_header_is_unauthorized() {
    let response = app().oneshot(request(None, Some("good"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Unauthorized");
}

#[tokio::test]
async fn test_rejection_message_reaches_caller() {
    let response = app()
        .oneshot(request(Some("dev1/mod1"), Some("stale")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "token expired");
}

#[tokio::test]
async fn test_fault_is_a_server_error() {
    let response = app()
        .oneshot(request(Some("dev1/mod1"), Some("boom")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let marker = response.extensions().get::<AuthFaultMarker>().unwrap();
    assert_eq!(marker.0.identity(), "dev1/mod1");
    assert_ne!(body_text(response).await, "Unauthorized");
}

#[tokio::test]
async fn test_identity_extractor_without_layer_fails_closed() {
    let app = Router::new().route("/whoami", get(whoami));

    let response = app
        .oneshot(request(Some("dev1/mod1"), Some("good")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
