use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Seam to the external language/embedding model server.
///
/// The chatbot never runs a model in-process; both generation and query
/// embedding go through this trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai_compat").
    fn name(&self) -> &str;

    /// Check if the provider is healthy/reachable.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Chat completion (non-streaming).
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// Generate embeddings, one vector per input.
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
