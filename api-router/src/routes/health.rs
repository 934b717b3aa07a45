use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Health probe: reports whether the vector store answers and how many
/// chunks it holds, plus any configuration problems found at startup.
///
/// Returns 200 when the store is reachable, 503 otherwise. A misconfigured
/// process keeps serving this route so operators can see what is wrong.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let (store_reachable, document_count) = match state.store.count().await {
        Ok(count) => (true, count),
        Err(e) => {
            tracing::warn!(error = %e, "health probe could not reach the vector store");
            (false, 0)
        }
    };

    let degraded = !store_reachable || !state.config_issues.is_empty();
    let status_code = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(json!({
            "status": if degraded { "degraded" } else { "ok" },
            "service": "rag-api",
            "store_reachable": store_reachable,
            "document_count": document_count,
            "config_issues": *state.config_issues,
        })),
    )
}
