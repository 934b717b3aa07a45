use serde::{Deserialize, Serialize};

/// Descriptive fields carried by every chunk into the store and back out
/// with every retrieved match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChunkMetadata {
    pub entity: Option<String>,
    /// Normalized fiscal period, `FY` followed by a four digit year.
    pub fiscal_period: Option<String>,
    /// `"financial"` for period-bearing filings, `"text"` otherwise.
    pub document_kind: String,
    /// Stable identifier of the source document, e.g. its object path.
    pub origin: String,
}

impl ChunkMetadata {
    /// Source line used in answer citations.
    pub fn citation(&self) -> String {
        match &self.fiscal_period {
            Some(period) => format!("{} (FY: {period})", self.origin),
            None => self.origin.clone(),
        }
    }
}

/// A raw document handed over by a loader, not yet chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub origin: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}
