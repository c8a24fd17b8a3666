// ── Authentication middleware ──
//
// Runs the pipeline in front of every route. Rejections become a 401 with
// the rejection's public message; faults become a 500 and are never
// downgraded to a 401.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use edgehub_core::{AuthOutcome, AuthenticationPipeline, Authenticator, PipelineFault};
use http::{StatusCode, header};
use tracing::error;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// axum middleware body. Use with [`axum::middleware::from_fn_with_state`],
/// or through [`with_authentication`].
pub async fn authenticate<A>(
    State(pipeline): State<Arc<AuthenticationPipeline<A>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthFault>
where
    A: Authenticator + 'static,
{
    match pipeline.authenticate(&mut request).await? {
        AuthOutcome::Authenticated(_) => Ok(next.run(request).await),
        AuthOutcome::Unauthorized(rejection) => Ok((
            StatusCode::UNAUTHORIZED,
            [(header::CONTENT_TYPE, PLAIN_TEXT)],
            rejection.public_message().to_owned(),
        )
            .into_response()),
    }
}

/// Layer `router` with the authentication middleware.
pub fn with_authentication<A, S>(router: Router<S>, pipeline: Arc<AuthenticationPipeline<A>>) -> Router<S>
where
    A: Authenticator + 'static,
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(pipeline, authenticate::<A>))
}

// ── Faults ──────────────────────────────────────────────────────────

/// Pipeline fault escaping the middleware.
#[derive(Debug, Clone)]
pub struct AuthFault(Arc<PipelineFault>);

impl AuthFault {
    pub fn fault(&self) -> &PipelineFault {
        &self.0
    }
}

impl From<PipelineFault> for AuthFault {
    fn from(fault: PipelineFault) -> Self {
        Self(Arc::new(fault))
    }
}

/// Attached to the 500 response so an outer layer can tell an
/// authentication fault apart from a handler failure.
#[derive(Debug, Clone)]
pub struct AuthFaultMarker(pub Arc<PipelineFault>);

impl IntoResponse for AuthFault {
    fn into_response(self) -> Response {
        error!(identity = %self.0.identity(), error = %self.0, "authentication fault");
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, PLAIN_TEXT)],
            "Internal Server Error",
        )
            .into_response();
        response.extensions_mut().insert(AuthFaultMarker(self.0));
        response
    }
}
