use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService};
use crate::core::security::{ApiKeyStore, InMemoryKeyStore};
use crate::feedback::FeedbackStore;
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::pipeline::{QueryProcessor, ResponseGenerator, SafetyValidator};
use crate::profiles::{JsonProfileStore, ProfileStore};
use crate::retrieval::DocumentRetriever;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Holds the full request pipeline plus the stores it reads from. Everything
/// except the feedback database is loaded once at startup and immutable
/// thereafter.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub provider: Arc<dyn LlmProvider>,
    pub retriever: Arc<DocumentRetriever>,
    pub query_processor: Arc<QueryProcessor>,
    pub generator: Arc<ResponseGenerator>,
    pub validator: Arc<SafetyValidator>,
    pub feedback: FeedbackStore,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// Retrieval artifacts and profiles load tolerantly (a missing knowledge
    /// base degrades to empty retrieval); only the feedback database is
    /// allowed to fail startup.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let provider: Arc<dyn LlmProvider> =
            Arc::new(OpenAiCompatProvider::new(config.llm_base_url()));

        let api_keys: Arc<dyn ApiKeyStore> =
            Arc::new(InMemoryKeyStore::new(config.default_api_key()));

        let profiles: Arc<dyn ProfileStore> =
            Arc::new(JsonProfileStore::load(&paths.profiles_path));

        let retriever = Arc::new(DocumentRetriever::load(
            &paths,
            provider.clone(),
            config.embedding_model(),
        ));
        tracing::info!(
            "Retriever ready with {} documents",
            retriever.document_count()
        );

        let generator = Arc::new(ResponseGenerator::new(
            provider.clone(),
            config.chat_model(),
            config.generation_temperature(),
            config.generation_max_tokens(),
        ));

        let feedback = FeedbackStore::new(paths.feedback_db_path.clone())
            .await
            .map_err(|e| InitializationError::Feedback(e.into()))?;

        Ok(Arc::new(AppState {
            paths,
            config,
            api_keys,
            profiles,
            provider,
            retriever,
            query_processor: Arc::new(QueryProcessor::new()),
            generator,
            validator: Arc::new(SafetyValidator::new()),
            feedback,
        }))
    }
}
