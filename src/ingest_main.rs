//! Knowledge-base builder. Run before starting the server:
//!
//! ```text
//! ingest [raw-dir]
//! ```
//!
//! Reads `.txt` files from `raw-dir` (default `data/raw`), chunks and embeds
//! them, and writes the retrieval artifacts into the application data
//! directory.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use carebot_backend::core::config::{AppPaths, ConfigService};
use carebot_backend::ingest::{build_knowledge_base, ChunkerConfig};
use carebot_backend::llm::OpenAiCompatProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone());

    let raw_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.user_data_dir.join("data").join("raw"));

    let provider = Arc::new(OpenAiCompatProvider::new(config.llm_base_url()));

    let count = build_knowledge_base(
        &raw_dir,
        &paths,
        provider,
        &config.embedding_model(),
        &ChunkerConfig::default(),
    )
    .await?;

    tracing::info!("Knowledge base ready: {} chunks indexed", count);
    Ok(())
}
