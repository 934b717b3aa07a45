use std::cmp::Ordering;
use std::collections::HashSet;

use common::error::AppError;
use common::storage::vector::{RetrievedMatch, VectorStore};
use common::utils::config::AppConfig;
use tracing::debug;

/// Fetches candidate context for one query embedding.
///
/// When the question pins a fiscal period, a period-filtered search runs
/// first and its hits stay ahead of equally scored general hits; the general
/// remainder is capped so period hits are never crowded out. Without a
/// period the general search stands alone. The result is ordered by
/// descending score with the merge order as the tie-break.
pub async fn retrieve_context(
    store: &dyn VectorStore,
    embedding: Vec<f32>,
    fiscal_period: Option<&str>,
    config: &AppConfig,
) -> Result<Vec<RetrievedMatch>, AppError> {
    let mut matches = match fiscal_period {
        None => store.query(embedding, config.top_k, None).await?,
        Some(period) => {
            let filtered = store
                .query(
                    embedding.clone(),
                    config.filtered_top_k,
                    Some(period.to_string()),
                )
                .await?;
            let general = store.query(embedding, config.top_k, None).await?;

            debug!(
                period = %period,
                period_matches = filtered.len(),
                general_matches = general.len(),
                "period-aware retrieval"
            );

            if filtered.is_empty() {
                general
            } else {
                merge_period_first(filtered, general, config.filtered_top_k)
            }
        }
    };

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    Ok(matches)
}

fn merge_period_first(
    filtered: Vec<RetrievedMatch>,
    general: Vec<RetrievedMatch>,
    remainder_cap: usize,
) -> Vec<RetrievedMatch> {
    let seen: HashSet<String> = filtered.iter().map(|m| m.chunk_id.clone()).collect();

    let mut merged = filtered;
    merged.extend(
        general
            .into_iter()
            .filter(|m| !seen.contains(&m.chunk_id))
            .take(remainder_cap),
    );

    merged
}
