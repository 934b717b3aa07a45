#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod constraints;
pub mod generation;
pub mod retrieval;
pub mod services;
pub mod state;
pub mod validation;


use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::error::AppError;
use common::storage::vector::{RetrievedMatch, VectorStore};
use common::utils::config::AppConfig;
use serde::Serialize;
use state_machines::core::GuardError;
use tracing::{debug, info, warn};

pub use constraints::{ConstraintExtractor, KeywordConstraintExtractor, QueryConstraints};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultQueryServices, GenerationRequest, QueryServices};
pub use validation::AnswerabilityVerdict;

/// Matches that reach the prompt and the citation list.
const CONTEXT_DOCUMENT_LIMIT: usize = 5;

/// Strategy the router selected for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerType {
    /// Generated from retrieved documents.
    #[serde(rename = "RAG")]
    Rag,
    /// Context exists but fails validation; nothing was generated.
    #[serde(rename = "RAG_NO_ANSWER")]
    RagNoAnswer,
    /// Generated from model knowledge alone.
    #[serde(rename = "LLM")]
    Llm,
}

impl AnswerType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerType::Rag => "RAG",
            AnswerType::RagNoAnswer => "RAG_NO_ANSWER",
            AnswerType::Llm => "LLM",
        }
    }
}

/// The response contract for every question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub answer_type: AnswerType,
    /// Citation lines, one per document origin. Always a list, empty when
    /// nothing was retrieved.
    pub sources: Vec<String>,
}

/// Drives one question through retrieve, validate and route.
///
/// Retrieval always runs first. Generation from context happens only after
/// every detected constraint is satisfied and the best match clears the
/// relevance floor; otherwise the pipeline declines or falls back, it never
/// fabricates a grounded answer.
pub struct AnswerPipeline {
    store: Arc<dyn VectorStore>,
    services: Arc<dyn QueryServices>,
    extractor: Arc<dyn ConstraintExtractor>,
    config: AppConfig,
}

impl AnswerPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        services: Arc<dyn QueryServices>,
        config: AppConfig,
    ) -> Self {
        Self::with_extractor(store, services, Arc::new(KeywordConstraintExtractor), config)
    }

    pub fn with_extractor(
        store: Arc<dyn VectorStore>,
        services: Arc<dyn QueryServices>,
        extractor: Arc<dyn ConstraintExtractor>,
        config: AppConfig,
    ) -> Self {
        AnswerPipeline {
            store,
            services,
            extractor,
            config,
        }
    }

    #[tracing::instrument(skip_all, fields(question_chars = question.chars().count()))]
    pub async fn answer_query(&self, question: &str) -> Result<AnswerResult, AppError> {
        let started = Instant::now();

        let constraints = self.extractor.extract(question);
        debug!(
            entity = ?constraints.entity,
            fiscal_period = ?constraints.fiscal_period,
            metrics = ?constraints.metrics,
            unconstrained = constraints.is_unconstrained(),
            "question constraints detected"
        );

        let embedding = self.services.embed_query(question).await?;
        let matches = retrieval::retrieve_context(
            self.store.as_ref(),
            embedding,
            constraints.fiscal_period.as_deref(),
            &self.config,
        )
        .await?;

        let machine = state::retrieved();

        let result = if matches.is_empty() {
            let _machine = machine
                .bypass()
                .map_err(|(_, guard)| map_guard_error("bypass", &guard))?;
            debug!("no stored context; answering from general knowledge");

            AnswerResult {
                answer: self.fallback_answer(question).await?,
                answer_type: AnswerType::Llm,
                sources: Vec::new(),
            }
        } else {
            let machine = machine
                .validate()
                .map_err(|(_, guard)| map_guard_error("validate", &guard))?;
            let verdict = validation::validate(&constraints, &matches, self.config.relevance_floor);
            let sources = sources_from_matches(&matches);

            if verdict.answerable() {
                let _machine = machine
                    .accept()
                    .map_err(|(_, guard)| map_guard_error("accept", &guard))?;
                self.grounded_or_fallback(question, &matches, sources).await?
            } else {
                let _machine = machine
                    .reject()
                    .map_err(|(_, guard)| map_guard_error("reject", &guard))?;
                info!(
                    unmet = ?verdict.unmet,
                    top_score = verdict.top_score,
                    "retrieved context does not cover the requested scope; declining to generate"
                );

                AnswerResult {
                    answer: generation::NO_ANSWER_MESSAGE.to_string(),
                    answer_type: AnswerType::RagNoAnswer,
                    sources,
                }
            }
        };

        info!(
            answer_type = result.answer_type.as_str(),
            sources = result.sources.len(),
            duration_ms = duration_millis(started.elapsed()),
            "query answered"
        );

        Ok(result)
    }

    /// The grounded path. A failed or unusable grounded answer degrades to
    /// general knowledge; the retrieved sources survive the downgrade.
    async fn grounded_or_fallback(
        &self,
        question: &str,
        matches: &[RetrievedMatch],
        sources: Vec<String>,
    ) -> Result<AnswerResult, AppError> {
        let context: Vec<RetrievedMatch> = matches
            .iter()
            .take(CONTEXT_DOCUMENT_LIMIT)
            .cloned()
            .collect();

        let grounded = match self
            .services
            .generate(generation::grounded_request(question, &context))
            .await
        {
            Ok(answer) => match generation::grounded_answer_defect(&answer, question) {
                None => Some(answer),
                Some(reason) => {
                    warn!(
                        reason = %reason,
                        "grounded answer unusable; answering from general knowledge"
                    );
                    None
                }
            },
            Err(err) => {
                warn!(
                    error = %err,
                    "generation failed on the grounded path; answering from general knowledge"
                );
                None
            }
        };

        match grounded {
            Some(answer) => Ok(AnswerResult {
                answer: generation::append_quality_notes(answer, question),
                answer_type: AnswerType::Rag,
                sources,
            }),
            None => Ok(AnswerResult {
                answer: self.fallback_answer(question).await?,
                answer_type: AnswerType::Llm,
                sources,
            }),
        }
    }

    async fn fallback_answer(&self, question: &str) -> Result<String, AppError> {
        let raw = self
            .services
            .generate(generation::fallback_request(question))
            .await?;

        Ok(generation::wrap_llm_answer(&raw, question))
    }
}

/// Citation lines for the strongest matches, deduplicated by origin.
fn sources_from_matches(matches: &[RetrievedMatch]) -> Vec<String> {
    let mut seen = HashSet::new();

    matches
        .iter()
        .take(CONTEXT_DOCUMENT_LIMIT)
        .filter(|m| seen.insert(m.metadata.origin.clone()))
        .map(RetrievedMatch::citation)
        .collect()
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid answer pipeline transition during {event}: {guard:?}"
    ))
}

fn duration_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
