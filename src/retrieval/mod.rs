//! Document retrieval over the offline-built knowledge base.
//!
//! - `DocumentStore`: id → content/metadata mapping, loaded read-only
//! - `VectorIndex` / `FlatVectorIndex`: nearest-neighbor search seam
//! - `DocumentRetriever`: embed → search → resolve pipeline

pub mod documents;
pub mod index;
pub mod retriever;

pub use documents::{DocumentRecord, DocumentStore, RetrievedDocument, RetrievedMetadata};
pub use index::{FlatVectorIndex, VectorIndex};
pub use retriever::DocumentRetriever;
