use common::utils::finance::{canonical_entity, extract_fiscal_period, extract_metrics};

/// Structured scope a question asks about. Every field is optional; an
/// undetected constraint widens the search instead of failing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryConstraints {
    /// Canonical entity name, e.g. `Oracle Financial Services Software Ltd`.
    pub entity: Option<String>,
    /// Normalized `FYxxxx` period.
    pub fiscal_period: Option<String>,
    /// Metric identifiers from the shared keyword tables.
    pub metrics: Vec<&'static str>,
}

impl QueryConstraints {
    /// True when nothing was detected and any retrieved match is acceptable.
    pub fn is_unconstrained(&self) -> bool {
        self.entity.is_none() && self.fiscal_period.is_none() && self.metrics.is_empty()
    }
}

/// Turns free-form question text into structured constraints.
pub trait ConstraintExtractor: Send + Sync {
    fn extract(&self, question: &str) -> QueryConstraints;
}

/// Extractor over the shared finance vocabulary: entity aliases, fiscal
/// period patterns and metric keyword groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordConstraintExtractor;

impl ConstraintExtractor for KeywordConstraintExtractor {
    fn extract(&self, question: &str) -> QueryConstraints {
        QueryConstraints {
            entity: canonical_entity(question),
            fiscal_period: extract_fiscal_period(question),
            metrics: extract_metrics(question),
        }
    }
}
