use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::llm::ChatMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatApiRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub chat_history: Option<Vec<ChatMessage>>,
}

/// Main chat endpoint: input gate → personalization → retrieval →
/// generation → output gate.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatApiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.api_keys).await?;

    let input_validation = state.validator.validate_input(&body.message);
    if !input_validation.valid {
        return Err(ApiError::InputRejected(
            input_validation
                .reason
                .unwrap_or_else(|| "Invalid input".to_string()),
        ));
    }

    let user_id = body.user_id.as_deref().unwrap_or("anonymous");
    let profile = if user_id != "anonymous" {
        state.profiles.get(user_id).await
    } else {
        None
    };

    let processed = state.query_processor.process(
        &body.message,
        profile.as_ref(),
        body.chat_history.as_deref(),
    );

    // A dead retrieval backend degrades to an uncontextualized answer
    // instead of failing the request.
    let retrieved = match state
        .retriever
        .retrieve(&processed.processed, state.config.retrieval_top_k())
        .await
    {
        Ok(docs) => docs,
        Err(err) => {
            tracing::error!("Retrieval failed, answering without context: {}", err);
            Vec::new()
        }
    };

    let response = state
        .generator
        .generate(
            &body.message,
            &retrieved,
            body.chat_history.as_deref(),
            profile.as_ref(),
        )
        .await;

    let output_validation = state.validator.validate_output(&response);
    if !output_validation.valid {
        let reason = output_validation
            .reason
            .unwrap_or_else(|| "Invalid output".to_string());
        tracing::warn!("Output validation failed: {}", reason);
        return Err(ApiError::OutputRejected(reason));
    }

    tracing::info!(
        "Chat interaction - User: {}, Message: {:.50}...",
        user_id,
        body.message
    );

    let sources: Vec<_> = retrieved.iter().map(|doc| &doc.metadata).collect();
    Ok(Json(json!({
        "response": response,
        "sources": sources
    })))
}
