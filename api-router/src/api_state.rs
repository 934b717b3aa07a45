use std::sync::Arc;

use answer_pipeline::AnswerPipeline;
use common::{storage::vector::VectorStore, utils::config::AppConfig};

/// Shared state for the API routes.
///
/// The store handle and the answer pipeline are built once by the process
/// entry point and injected here; routes never construct their own clients.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn VectorStore>,
    pub answers: Arc<AnswerPipeline>,
    pub config: AppConfig,
    /// Configuration problems found at startup. When non-empty the process
    /// serves in a degraded state and the health probe reports them.
    pub config_issues: Arc<Vec<String>>,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn VectorStore>,
        answers: Arc<AnswerPipeline>,
        config: AppConfig,
        config_issues: Vec<String>,
    ) -> Self {
        ApiState {
            store,
            answers,
            config,
            config_issues: Arc::new(config_issues),
        }
    }
}
