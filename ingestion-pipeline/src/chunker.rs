use common::{
    error::AppError,
    storage::types::{chunk::Chunk, document::SourceDocument},
};
use text_splitter::{ChunkCapacity, ChunkConfig, TextSplitter};

/// Chunks produced from one or more documents, plus the number of spans
/// dropped for being too short to embed usefully.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub chunks: Vec<Chunk>,
    pub skipped_short: usize,
}

/// Splits document text into overlapping character-bounded spans.
///
/// Splitting is deterministic: the same document always yields the same
/// spans at the same byte offsets, which keeps chunk ids stable across runs.
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_chars: usize,
}

impl Chunker {
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        min_chunk_chars: usize,
    ) -> Result<Self, AppError> {
        if chunk_size == 0 {
            return Err(AppError::Validation("chunk_size must be positive".into()));
        }
        // The capacity floor is half the chunk size; the overlap has to fit under it.
        if chunk_overlap >= chunk_size / 2 {
            return Err(AppError::Validation(format!(
                "chunk_size must be more than double the configured overlap of {chunk_overlap}"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            min_chunk_chars,
        })
    }

    pub fn split_documents(&self, documents: &[SourceDocument]) -> Result<SplitOutcome, AppError> {
        let mut outcome = SplitOutcome::default();
        for document in documents {
            self.split_document(document, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn split_document(
        &self,
        document: &SourceDocument,
        outcome: &mut SplitOutcome,
    ) -> Result<(), AppError> {
        let chunk_capacity = ChunkCapacity::new(self.chunk_size / 2)
            .with_max(self.chunk_size)
            .map_err(|e| AppError::Validation(format!("invalid chunk bounds: {e}")))?;
        let chunk_config = ChunkConfig::new(chunk_capacity)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;
        let splitter = TextSplitter::new(chunk_config);

        for (offset, span) in splitter.chunk_indices(&document.text) {
            if span.chars().count() < self.min_chunk_chars {
                outcome.skipped_short += 1;
                continue;
            }
            outcome
                .chunks
                .push(Chunk::new(span.to_string(), offset, document.metadata.clone()));
        }

        Ok(())
    }
}
