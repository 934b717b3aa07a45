use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use common::error::AppError;
use common::utils::config::AppConfig;
use common::utils::embedding::EmbeddingProvider;
use tokio::time::timeout;

/// One prompt ready for the chat backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
}

/// External calls the answer path depends on. Query-time calls fail fast;
/// retries belong to the ingestion write path.
#[async_trait]
pub trait QueryServices: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Produces prose for the given prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, AppError>;
}

/// OpenAI-backed services with a per-call timeout.
pub struct DefaultQueryServices {
    chat_client: Arc<Client<OpenAIConfig>>,
    embeddings: Arc<EmbeddingProvider>,
    chat_model: String,
    request_timeout: Duration,
}

impl DefaultQueryServices {
    pub fn new(
        chat_client: Arc<Client<OpenAIConfig>>,
        embeddings: Arc<EmbeddingProvider>,
        config: &AppConfig,
    ) -> Self {
        DefaultQueryServices {
            chat_client,
            embeddings,
            chat_model: config.chat_model.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl QueryServices for DefaultQueryServices {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        timeout(self.request_timeout, self.embeddings.embed(text))
            .await
            .map_err(|_| {
                AppError::Service(format!(
                    "embedding request timed out after {}s",
                    self.request_timeout.as_secs()
                ))
            })?
            .map_err(|err| AppError::Service(format!("embedding request failed: {err}")))
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, AppError> {
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .temperature(request.temperature)
            .messages([
                ChatCompletionRequestSystemMessage::from(request.system_prompt).into(),
                ChatCompletionRequestUserMessage::from(request.user_message).into(),
            ])
            .build()?;

        let response = timeout(
            self.request_timeout,
            self.chat_client.chat().create(chat_request),
        )
        .await
        .map_err(|_| {
            AppError::Service(format!(
                "generation request timed out after {}s",
                self.request_timeout.as_secs()
            ))
        })??;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .cloned()
            .ok_or_else(|| AppError::LLMParsing("No content found in LLM response".into()))
    }
}
