use common::storage::vector::RetrievedMatch;
use common::utils::finance::metric_keywords;

use crate::constraints::QueryConstraints;

/// What validation concluded about the retrieved context.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerabilityVerdict {
    /// Detected constraints no retrieved match satisfies, as log labels.
    pub unmet: Vec<String>,
    /// Similarity of the best match, zero when nothing was retrieved.
    pub top_score: f32,
    pub floor_cleared: bool,
}

impl AnswerabilityVerdict {
    /// Generation from context is only allowed on a full pass.
    pub fn answerable(&self) -> bool {
        self.unmet.is_empty() && self.floor_cleared
    }
}

/// Checks every detected constraint against the retrieved matches.
///
/// An undetected constraint is a wildcard; a detected constraint without a
/// satisfying match is what blocks generation. The matches are expected in
/// descending score order, so the first one carries the top score.
pub fn validate(
    constraints: &QueryConstraints,
    matches: &[RetrievedMatch],
    relevance_floor: f32,
) -> AnswerabilityVerdict {
    let mut unmet = Vec::new();

    if let Some(entity) = &constraints.entity {
        if !matches.iter().any(|m| entity_satisfied(entity, m)) {
            unmet.push(format!("entity {entity}"));
        }
    }

    if let Some(period) = &constraints.fiscal_period {
        if !matches.iter().any(|m| period_satisfied(period, m)) {
            unmet.push(format!("fiscal period {period}"));
        }
    }

    for metric in &constraints.metrics {
        if !matches.iter().any(|m| metric_satisfied(metric, m)) {
            unmet.push(format!("metric {metric}"));
        }
    }

    let top_score = matches.first().map_or(0.0, |m| m.score);

    AnswerabilityVerdict {
        unmet,
        top_score,
        floor_cleared: top_score >= relevance_floor,
    }
}

/// The stored entity and the requested one must contain one another in
/// either direction, so `Microsoft` matches `Microsoft Corporation`.
fn entity_satisfied(requested: &str, candidate: &RetrievedMatch) -> bool {
    candidate.metadata.entity.as_ref().is_some_and(|stored| {
        let stored = stored.to_lowercase();
        let requested = requested.to_lowercase();
        stored.contains(&requested) || requested.contains(&stored)
    })
}

fn period_satisfied(requested: &str, candidate: &RetrievedMatch) -> bool {
    candidate
        .metadata
        .fiscal_period
        .as_ref()
        .is_some_and(|stored| stored.eq_ignore_ascii_case(requested))
}

/// A metric counts as covered when one of its query keywords occurs in the
/// match text.
fn metric_satisfied(metric: &str, candidate: &RetrievedMatch) -> bool {
    let lowered = candidate.text.to_lowercase();

    metric_keywords(metric)
        .unwrap_or(&[])
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::document::ChunkMetadata;

    fn candidate(
        entity: Option<&str>,
        period: Option<&str>,
        text: &str,
        score: f32,
    ) -> RetrievedMatch {
        RetrievedMatch {
            chunk_id: format!("chunk-{text_len}", text_len = text.len()),
            score,
            text: text.to_string(),
            metadata: ChunkMetadata {
                entity: entity.map(str::to_string),
                fiscal_period: period.map(str::to_string),
                document_kind: "financial".to_string(),
                origin: "ofss/report.txt".to_string(),
            },
        }
    }

    fn oracle_constraints() -> QueryConstraints {
        QueryConstraints {
            entity: Some("Oracle Financial Services Software Ltd".to_string()),
            fiscal_period: Some("FY2023".to_string()),
            metrics: vec!["revenue"],
        }
    }

    #[test]
    fn test_all_constraints_satisfied_is_answerable() {
        let matches = vec![candidate(
            Some("Oracle Financial Services Software Ltd"),
            Some("FY2023"),
            "Revenue for the year was 56,958 million INR.",
            0.82,
        )];

        let verdict = validate(&oracle_constraints(), &matches, 0.35);

        assert!(verdict.answerable());
        assert!(verdict.unmet.is_empty());
    }

    #[test]
    fn test_wrong_period_blocks_generation() {
        let matches = vec![candidate(
            Some("Oracle Financial Services Software Ltd"),
            Some("FY2022"),
            "Revenue for the year was 49,589 million INR.",
            0.82,
        )];

        let verdict = validate(&oracle_constraints(), &matches, 0.35);

        assert!(!verdict.answerable());
        assert_eq!(verdict.unmet, vec!["fiscal period FY2023".to_string()]);
    }

    #[test]
    fn test_entity_containment_works_both_ways() {
        let constraints = QueryConstraints {
            entity: Some("Microsoft".to_string()),
            ..QueryConstraints::default()
        };
        let matches = vec![candidate(
            Some("Microsoft Corporation"),
            None,
            "Cloud revenue grew.",
            0.7,
        )];

        let verdict = validate(&constraints, &matches, 0.35);

        assert!(verdict.answerable());
    }

    #[test]
    fn test_metric_satisfied_by_any_group_keyword() {
        let constraints = QueryConstraints {
            metrics: vec!["net_income"],
            ..QueryConstraints::default()
        };
        // "net profit" is in the net_income keyword group.
        let matches = vec![candidate(
            None,
            None,
            "Net profit rose to 21,386 million INR.",
            0.6,
        )];

        let verdict = validate(&constraints, &matches, 0.35);

        assert!(verdict.answerable());
    }

    #[test]
    fn test_missing_metric_keyword_is_reported() {
        let constraints = QueryConstraints {
            metrics: vec!["ebitda"],
            ..QueryConstraints::default()
        };
        let matches = vec![candidate(None, None, "Board remuneration details.", 0.6)];

        let verdict = validate(&constraints, &matches, 0.35);

        assert_eq!(verdict.unmet, vec!["metric ebitda".to_string()]);
    }

    #[test]
    fn test_weak_top_score_fails_the_floor() {
        let constraints = QueryConstraints::default();
        let matches = vec![candidate(None, None, "Unrelated trivia.", 0.2)];

        let verdict = validate(&constraints, &matches, 0.35);

        assert!(verdict.unmet.is_empty());
        assert!(!verdict.floor_cleared);
        assert!(!verdict.answerable());
    }

    #[test]
    fn test_constraint_satisfied_by_any_single_match() {
        let matches = vec![
            candidate(None, Some("FY2023"), "Revenue commentary without names.", 0.8),
            candidate(
                Some("Oracle Financial Services Software Ltd"),
                Some("FY2022"),
                "Prior year comparison.",
                0.7,
            ),
        ];

        let verdict = validate(&oracle_constraints(), &matches, 0.35);

        // Entity, period and metric are each covered by some match, not
        // necessarily the same one.
        assert!(verdict.answerable());
    }
}
