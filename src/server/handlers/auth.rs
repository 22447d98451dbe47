use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Issued keys are valid for one hour.
const TOKEN_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Exchange demo credentials for a TTL-bound API key.
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(ApiError::BadRequest(
            "Username and password required".to_string(),
        ));
    };

    let Some((expected_user, expected_password)) = state.config.demo_credentials() else {
        tracing::warn!("Token requested but no demo credentials configured");
        return Err(ApiError::Unauthorized);
    };

    let username_ok: bool = expected_user.as_bytes().ct_eq(username.as_bytes()).into();
    let password_ok: bool = expected_password
        .as_bytes()
        .ct_eq(password.as_bytes())
        .into();
    if !username_ok || !password_ok {
        tracing::warn!("Invalid credentials for token request");
        return Err(ApiError::Unauthorized);
    }

    let issued = state.api_keys.issue(&username, "user", TOKEN_TTL).await;

    Ok(Json(json!({
        "token": issued.token,
        "expires_at": issued.expires_at
    })))
}
