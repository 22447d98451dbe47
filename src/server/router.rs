use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::ConfigService;
use crate::server::handlers::{auth, chat, feedback, health};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config);
    Router::new()
        .route("/", get(health::index))
        .route("/api/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/feedback", post(feedback::submit_feedback))
        .route("/api/auth/token", post(auth::get_token))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(config: &ConfigService) -> CorsLayer {
    let configured = config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    let allow_origin = if configured.is_empty() {
        AllowOrigin::list(
            default_local_origins()
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(&origin).ok())
                .collect::<Vec<_>>(),
        )
    } else {
        AllowOrigin::list(configured)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:8501".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppPaths;
    use std::fs;

    #[test]
    fn default_origins_are_valid_header_values() {
        for origin in default_local_origins() {
            assert!(HeaderValue::from_str(&origin).is_ok());
        }
    }

    #[test]
    fn cors_layer_builds_from_configured_origins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.yml");
        fs::write(
            &config_path,
            "server:\n  cors_allowed_origins:\n    - https://carebot.example.org\n",
        )
        .expect("write config");

        let config = ConfigService::with_path(Arc::new(AppPaths::new()), config_path);
        assert_eq!(config.allowed_origins(), vec!["https://carebot.example.org"]);
        let _layer = build_cors_layer(&config);
    }
}
