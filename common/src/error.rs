use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Batch {batch} cardinality mismatch: ids={ids}, texts={texts}, embeddings={embeddings}, metadatas={metadatas}")]
    Cardinality {
        batch: usize,
        ids: usize,
        texts: usize,
        embeddings: usize,
        metadatas: usize,
    },
    #[error("Service error: {0}")]
    Service(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authorization error: {0}")]
    Auth(String),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Ingestion processing error: {0}")]
    Processing(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether a failed external call is worth another attempt on the
    /// ingestion write path. Query reads never retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::OpenAI(_) | Self::Service(_) | Self::Io(_)
        )
    }
}
