use axum::{extract::State, response::IntoResponse, Json};
use common::utils::input::normalize_user_input;
use serde::Deserialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Longest question accepted after normalization.
const MAX_QUESTION_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub question: Option<String>,
    /// Older clients send `query` instead of `question`; both are accepted.
    pub query: Option<String>,
}

/// Answers one question through the retrieve-validate-route pipeline.
pub async fn answer_question(
    State(state): State<ApiState>,
    Json(params): Json<QueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = params
        .question
        .or(params.query)
        .unwrap_or_default();
    let question = normalize_user_input(&raw);

    if question.is_empty() {
        return Err(ApiError::ValidationError(
            "question must not be empty".to_string(),
        ));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::PayloadTooLarge(format!(
            "question exceeds {MAX_QUESTION_CHARS} characters"
        )));
    }

    info!(question_chars = question.chars().count(), "query received");

    let result = state.answers.answer_query(&question).await?;

    Ok(Json(result))
}
