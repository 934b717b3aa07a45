#![allow(clippy::missing_docs_in_private_items)]

use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_auth::api_auth;
use routes::{health::health, liveness::live, query::answer_question};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Request bodies carry one question, nothing bigger. Sized for the longest
/// accepted question at four UTF-8 bytes per character plus JSON framing;
/// the handler's character cap is the real limit.
const QUERY_MAX_BODY_BYTES: usize = 32 * 1024;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let public = Router::new()
        .route("/health", get(health))
        .route("/live", get(live));

    // Protected API endpoints (require auth when a key is configured)
    let protected = Router::new()
        .route(
            "/query",
            post(answer_question).layer(DefaultBodyLimit::max(QUERY_MAX_BODY_BYTES)),
        )
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}
