pub mod core;
pub mod feedback;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod profiles;
pub mod retrieval;
pub mod server;
pub mod state;
