use std::sync::Arc;

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

use super::documents::{load_id_map, DocumentStore, RetrievedDocument, RetrievedMetadata};
use super::index::{FlatVectorIndex, VectorIndex};

/// Orchestrates query embedding, index search and document resolution.
///
/// All loaded artifacts are immutable for the process lifetime; `retrieve`
/// is a pure read.
pub struct DocumentRetriever {
    provider: Arc<dyn LlmProvider>,
    embedding_model: String,
    index: Option<Arc<dyn VectorIndex>>,
    id_map: Vec<String>,
    store: DocumentStore,
}

impl DocumentRetriever {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedding_model: String,
        index: Option<Arc<dyn VectorIndex>>,
        id_map: Vec<String>,
        store: DocumentStore,
    ) -> Self {
        Self {
            provider,
            embedding_model,
            index,
            id_map,
            store,
        }
    }

    /// Load the retrieval artifacts from disk. Any missing artifact degrades
    /// to an empty retriever rather than failing startup.
    pub fn load(
        paths: &AppPaths,
        provider: Arc<dyn LlmProvider>,
        embedding_model: String,
    ) -> Self {
        let index: Option<Arc<dyn VectorIndex>> = if paths.index_path.exists() {
            match FlatVectorIndex::load(&paths.index_path) {
                Ok(index) => {
                    tracing::info!(
                        "Loaded vector index ({} rows, dim {}) from {}",
                        index.len(),
                        index.dimension(),
                        paths.index_path.display()
                    );
                    Some(Arc::new(index))
                }
                Err(err) => {
                    tracing::error!("Error loading vector index: {}", err);
                    None
                }
            }
        } else {
            tracing::warn!("Index file not found at {}", paths.index_path.display());
            None
        };

        let id_map = load_id_map(&paths.id_map_path);
        let store = DocumentStore::load(&paths.document_content_path);

        Self::new(provider, embedding_model, index, id_map, store)
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    /// Retrieve the most relevant documents for a query, ordered by
    /// ascending distance.
    ///
    /// Missing index or id map yields `Ok(vec![])` — "no results" is a
    /// valid, non-fatal outcome. An embedding backend failure is an `Err`
    /// so callers can tell it apart from an empty knowledge base.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, ApiError> {
        let Some(index) = &self.index else {
            tracing::warn!("No index available for retrieval");
            return Ok(Vec::new());
        };
        if self.id_map.is_empty() {
            tracing::warn!("No ID map available for retrieval");
            return Ok(Vec::new());
        }

        let embeddings = self
            .provider
            .embed(&[query.to_string()], &self.embedding_model)
            .await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedding backend returned no vector".to_string()))?;

        let top_k = top_k.clamp(1, self.id_map.len());
        let hits = index.search(&query_embedding, top_k);

        let mut retrieved = Vec::with_capacity(hits.len());
        for (row, distance) in hits {
            // Backends may pad with negative sentinels when fewer than
            // top_k rows exist.
            if row < 0 {
                continue;
            }
            let Some(doc_id) = self.id_map.get(row as usize) else {
                continue;
            };
            let Some(record) = self.store.get(doc_id) else {
                tracing::debug!("Dropping hit for unknown document id {}", doc_id);
                continue;
            };

            retrieved.push(RetrievedDocument {
                id: doc_id.clone(),
                content: record.content.clone(),
                metadata: RetrievedMetadata {
                    source: record.source.clone(),
                    score: distance,
                    date: record.date.clone(),
                },
            });
        }

        tracing::info!(
            "Retrieved {} documents for query: {:.50}",
            retrieved.len(),
            query
        );
        Ok(retrieved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatRequest;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::retrieval::documents::DocumentRecord;

    struct FixedEmbedder {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Err(ApiError::Internal("not a chat provider".to_string()))
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            if self.fail {
                return Err(ApiError::Internal("embedding backend down".to_string()));
            }
            Ok(vec![self.vector.clone(); inputs.len()])
        }
    }

    fn record(content: &str, source: &str) -> DocumentRecord {
        DocumentRecord {
            content: content.to_string(),
            source: source.to_string(),
            date: "2025-01-01".to_string(),
        }
    }

    fn sample_retriever(fail_embed: bool) -> DocumentRetriever {
        let provider = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0, 0.0],
            fail: fail_embed,
        });

        let index = FlatVectorIndex::from_vectors(
            3,
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.8, 0.2, 0.0],
            ],
        );

        let mut documents = HashMap::new();
        documents.insert("doc_0".to_string(), record("Get a flu shot yearly", "CDC"));
        documents.insert("doc_1".to_string(), record("Eat more vegetables", "WHO"));
        documents.insert("doc_2".to_string(), record("Walk 30 minutes a day", "NIH"));

        DocumentRetriever::new(
            provider,
            "embed".to_string(),
            Some(Arc::new(index)),
            vec!["doc_0".to_string(), "doc_1".to_string(), "doc_2".to_string()],
            DocumentStore::from_map(documents),
        )
    }

    #[tokio::test]
    async fn retrieve_orders_by_non_decreasing_distance() {
        let retriever = sample_retriever(false);
        let results = retriever.retrieve("flu shot", 3).await.expect("retrieve");

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "doc_0");
        for pair in results.windows(2) {
            assert!(pair[0].metadata.score <= pair[1].metadata.score);
        }
    }

    #[tokio::test]
    async fn retrieve_caps_results_at_top_k() {
        let retriever = sample_retriever(false);
        let results = retriever.retrieve("flu shot", 2).await.expect("retrieve");
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn retrieve_without_index_returns_empty() {
        let provider = Arc::new(FixedEmbedder {
            vector: vec![1.0],
            fail: false,
        });
        let retriever = DocumentRetriever::new(
            provider,
            "embed".to_string(),
            None,
            Vec::new(),
            DocumentStore::default(),
        );

        let results = retriever.retrieve("anything", 3).await.expect("retrieve");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn retrieve_skips_ids_missing_from_store() {
        let provider = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0, 0.0],
            fail: false,
        });
        let index = FlatVectorIndex::from_vectors(3, vec![vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0]]);

        let mut documents = HashMap::new();
        documents.insert("doc_0".to_string(), record("Get a flu shot yearly", "CDC"));
        // doc_missing has an index row but no content entry.

        let retriever = DocumentRetriever::new(
            provider,
            "embed".to_string(),
            Some(Arc::new(index)),
            vec!["doc_0".to_string(), "doc_missing".to_string()],
            DocumentStore::from_map(documents),
        );

        let results = retriever.retrieve("flu", 2).await.expect("retrieve");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "doc_0");
    }

    #[tokio::test]
    async fn embedding_failure_is_an_error_not_empty() {
        let retriever = sample_retriever(true);
        let result = retriever.retrieve("flu shot", 3).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }
}
