use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::feedback::FeedbackEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub entry: FeedbackEntry,
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.api_keys).await?;

    let user_id = body.user_id.as_deref().unwrap_or("anonymous");
    let feedback_id = state.feedback.insert(user_id, &body.entry).await?;
    tracing::info!("Feedback received: {} from {}", feedback_id, user_id);

    Ok(Json(json!({
        "status": "success",
        "message": "Feedback received"
    })))
}
