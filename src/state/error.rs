use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize feedback store: {0}")]
    Feedback(#[source] anyhow::Error),
}
