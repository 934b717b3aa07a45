use serde::Serialize;

/// Totals for one ingestion run, logged at the end and returned to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    /// Chunks that entered batching after the short-span filter.
    pub processed_count: usize,
    /// Chunks dropped for falling below the minimum character threshold.
    pub skipped_short_count: usize,
    pub embedded_count: usize,
    pub stored_count: usize,
    pub final_collection_count: usize,
    /// 1-based indexes of batches that failed embedding or storage.
    pub failed_batch_ids: Vec<usize>,
    /// Chunk ids belonging to the failed batches, for replay.
    pub failed_chunk_ids: Vec<String>,
}
