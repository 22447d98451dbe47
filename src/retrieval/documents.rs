use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One knowledge-base document chunk as produced by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub date: String,
}

/// Metadata attached to a retrieval hit. `score` is a distance from the
/// vector index (lower = more similar), not a normalized probability.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMetadata {
    pub source: String,
    pub score: f32,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub metadata: RetrievedMetadata,
}

/// Read-only mapping from document id to content and metadata, loaded once
/// at startup.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: HashMap<String, DocumentRecord>,
}

impl DocumentStore {
    pub fn from_map(documents: HashMap<String, DocumentRecord>) -> Self {
        Self { documents }
    }

    /// Load the store from its JSON file. A missing or malformed file
    /// degrades to an empty store so retrieval can report "no results".
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!("Document content file not found at {}", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, DocumentRecord>>(&contents)
            {
                Ok(documents) => {
                    tracing::info!(
                        "Loaded content for {} documents from {}",
                        documents.len(),
                        path.display()
                    );
                    Self { documents }
                }
                Err(err) => {
                    tracing::error!("Error parsing document content: {}", err);
                    Self::default()
                }
            },
            Err(err) => {
                tracing::error!("Error reading document content: {}", err);
                Self::default()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Positional list mapping index rows to document ids. Missing or malformed
/// files degrade to an empty list.
pub fn load_id_map(path: &Path) -> Vec<String> {
    if !path.exists() {
        tracing::warn!("ID map file not found at {}", path.display());
        return Vec::new();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Vec<String>>(&contents) {
            Ok(ids) => {
                tracing::info!("Loaded {} document IDs from {}", ids.len(), path.display());
                ids
            }
            Err(err) => {
                tracing::error!("Error parsing ID map: {}", err);
                Vec::new()
            }
        },
        Err(err) => {
            tracing::error!("Error reading ID map: {}", err);
            Vec::new()
        }
    }
}
