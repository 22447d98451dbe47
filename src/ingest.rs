//! Offline knowledge-base ingestion: chunking, embedding and indexing.
//!
//! Produces the three artifacts the retriever loads read-only:
//! `document_content.json`, `id_map.json` and `index.bin`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;

use crate::core::config::AppPaths;
use crate::llm::LlmProvider;
use crate::retrieval::{DocumentRecord, FlatVectorIndex};

/// Embedding requests are batched to keep payloads reasonable.
const EMBED_BATCH_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

/// Split text into overlapping chunks, preferring sentence boundaries near
/// the end of each chunk.
pub fn split_into_chunks(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let chunk_size = config.chunk_size;
    let overlap = config.chunk_overlap;

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    let mut chunks = Vec::new();
    if total_chars == 0 {
        return chunks;
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut start = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let chunk_text: String = chars[start..end].iter().collect();

        let final_text = if end < total_chars {
            cut_at_sentence_boundary(&chunk_text)
        } else {
            chunk_text
        };

        let trimmed = final_text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start += step;
    }

    chunks
}

/// Look for a sentence ending in the last 20% of the chunk and cut there.
fn cut_at_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let search_start = text
        .char_indices()
        .nth(text.chars().count() * 80 / 100)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}

/// Chunk every `.txt` file under `raw_dir`, embed the chunks and write the
/// retrieval artifacts.
pub async fn build_knowledge_base(
    raw_dir: &Path,
    paths: &AppPaths,
    provider: Arc<dyn LlmProvider>,
    embedding_model: &str,
    config: &ChunkerConfig,
) -> anyhow::Result<usize> {
    let mut entries: Vec<_> = fs::read_dir(raw_dir)
        .with_context(|| format!("Failed to read raw directory {}", raw_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    entries.sort();

    if entries.is_empty() {
        bail!("No .txt files found in {}", raw_dir.display());
    }

    let today = Utc::now().format("%Y-%m-%d").to_string();

    let mut id_map: Vec<String> = Vec::new();
    let mut documents: HashMap<String, DocumentRecord> = HashMap::new();
    let mut texts: Vec<String> = Vec::new();

    for path in &entries {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let chunks = split_into_chunks(&text, config);
        tracing::info!("Chunked {} into {} chunks", source, chunks.len());

        for (i, chunk) in chunks.into_iter().enumerate() {
            let doc_id = format!("{}_{}", stem, i);
            id_map.push(doc_id.clone());
            documents.insert(
                doc_id,
                DocumentRecord {
                    content: chunk.clone(),
                    source: source.clone(),
                    date: today.clone(),
                },
            );
            texts.push(chunk);
        }
    }

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let embeddings = provider
            .embed(batch, embedding_model)
            .await
            .map_err(|err| anyhow::anyhow!("Embedding failed: {}", err))?;
        if embeddings.len() != batch.len() {
            bail!(
                "Embedding backend returned {} vectors for {} inputs",
                embeddings.len(),
                batch.len()
            );
        }
        vectors.extend(embeddings);
    }

    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    if dim == 0 {
        bail!("Embedding backend returned empty vectors");
    }
    if vectors.iter().any(|v| v.len() != dim) {
        bail!("Embedding dimensions are inconsistent");
    }

    let index = FlatVectorIndex::from_vectors(dim, vectors);
    index
        .save(&paths.index_path)
        .with_context(|| format!("Failed to write {}", paths.index_path.display()))?;

    fs::write(&paths.id_map_path, serde_json::to_string_pretty(&id_map)?)
        .with_context(|| format!("Failed to write {}", paths.id_map_path.display()))?;

    fs::write(
        &paths.document_content_path,
        serde_json::to_string_pretty(&documents)?,
    )
    .with_context(|| format!("Failed to write {}", paths.document_content_path.display()))?;

    tracing::info!(
        "Indexed {} chunks from {} files (dim {})",
        id_map.len(),
        entries.len(),
        dim
    );

    Ok(id_map.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::llm::types::ChatRequest;
    use crate::retrieval::{DocumentStore, VectorIndex};
    use async_trait::async_trait;

    fn paths_in(dir: &std::path::Path) -> AppPaths {
        let embeddings_dir = dir.join("embeddings");
        let processed_dir = dir.join("processed");
        fs::create_dir_all(&embeddings_dir).expect("mkdir");
        fs::create_dir_all(&processed_dir).expect("mkdir");

        AppPaths {
            project_root: dir.to_path_buf(),
            user_data_dir: dir.to_path_buf(),
            log_dir: dir.join("logs"),
            document_content_path: processed_dir.join("document_content.json"),
            id_map_path: embeddings_dir.join("id_map.json"),
            index_path: embeddings_dir.join("index.bin"),
            profiles_path: dir.join("profiles.json"),
            feedback_db_path: dir.join("feedback.db"),
        }
    }

    struct CountingEmbedder;

    #[async_trait]
    impl LlmProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
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
            // Deterministic toy embedding: [len, vowels, spaces].
            Ok(inputs
                .iter()
                .map(|text| {
                    let len = text.chars().count() as f32;
                    let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    let spaces = text.chars().filter(|c| *c == ' ').count() as f32;
                    vec![len, vowels, spaces]
                })
                .collect())
        }
    }

    #[test]
    fn chunks_respect_size_and_cover_text() {
        let config = ChunkerConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let text = "This is a test sentence. ".repeat(20);

        let chunks = split_into_chunks(&text, &config);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
        // Step of 80 chars over 500 chars of text needs at least 6 chunks.
        assert!(chunks.len() >= 6);
    }

    #[test]
    fn chunks_prefer_sentence_boundaries() {
        let config = ChunkerConfig {
            chunk_size: 60,
            chunk_overlap: 10,
        };
        // The first sentence ends inside the last 20% of the first chunk
        // (index 54 of 60), where the boundary search looks.
        let text = "This chunk has sentences that finish near its end mark. Another sentence follows to force a second chunk.";

        let chunks = split_into_chunks(text, &config);
        assert!(chunks.len() >= 2);
        assert_eq!(
            chunks[0],
            "This chunk has sentences that finish near its end mark."
        );
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_into_chunks("", &ChunkerConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn build_knowledge_base_writes_loadable_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw_dir = dir.path().join("raw");
        fs::create_dir_all(&raw_dir).expect("mkdir");
        fs::write(
            raw_dir.join("flu.txt"),
            "Get a flu shot yearly. Vaccination protects against seasonal influenza.",
        )
        .expect("write");

        let paths = paths_in(dir.path());

        let count = build_knowledge_base(
            &raw_dir,
            &paths,
            Arc::new(CountingEmbedder),
            "embed",
            &ChunkerConfig::default(),
        )
        .await
        .expect("ingest");
        assert!(count >= 1);

        let store = DocumentStore::load(&paths.document_content_path);
        assert_eq!(store.len(), count);

        let index = FlatVectorIndex::load(&paths.index_path).expect("index");
        assert_eq!(index.len(), count);
        assert_eq!(index.dimension(), 3);

        let id_map = crate::retrieval::documents::load_id_map(&paths.id_map_path);
        assert_eq!(id_map.len(), count);
        assert!(id_map.iter().all(|id| store.contains(id)));
    }

    #[tokio::test]
    async fn build_knowledge_base_fails_on_empty_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw_dir = dir.path().join("raw");
        fs::create_dir_all(&raw_dir).expect("mkdir");

        let paths = paths_in(dir.path());

        let result = build_knowledge_base(
            &raw_dir,
            &paths,
            Arc::new(CountingEmbedder),
            "embed",
            &ChunkerConfig::default(),
        )
        .await;

        assert!(result.is_err());
    }
}
