use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::document::Document;

use crate::{api_state::ApiState, error::ApiError};

/// Lists ingested documents, newest first, without their raw text.
pub async fn list_documents(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let summaries = Document::list_summaries(&state.db).await?;
    Ok(Json(summaries))
}
