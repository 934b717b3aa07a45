use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{
    error::AppError,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};

/// External calls the ingestor makes while processing a batch.
#[async_trait]
pub trait IngestionServices: Send + Sync {
    /// Embeds every text in one call; the result preserves input order.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError>;
}

pub struct DefaultIngestionServices {
    embeddings: Arc<EmbeddingProvider>,
    request_timeout: Duration,
}

impl DefaultIngestionServices {
    pub fn new(embeddings: Arc<EmbeddingProvider>, config: &AppConfig) -> Self {
        Self {
            embeddings,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl IngestionServices for DefaultIngestionServices {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let embeddings = tokio::time::timeout(
            self.request_timeout,
            self.embeddings.embed_batch(texts),
        )
        .await
        .map_err(|_| {
            AppError::Service(format!(
                "embedding request timed out after {}s",
                self.request_timeout.as_secs()
            ))
        })?
        .map_err(|err| AppError::Service(format!("embedding request failed: {err}")))?;

        Ok(embeddings)
    }
}
