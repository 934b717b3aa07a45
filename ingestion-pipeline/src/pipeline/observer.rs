use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Stored,
    Failed,
}

/// Snapshot of one batch's trip through the ingestor.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// 1-based batch index.
    pub batch: usize,
    pub chunk_count: usize,
    /// Collection counts read around the write; zero when the batch failed
    /// before the first count read.
    pub pre_count: usize,
    pub post_count: usize,
    /// External calls made for this batch, retries included.
    pub attempts: usize,
    pub status: BatchStatus,
    pub duration_ms: u64,
}

/// Output target for per-batch progress events.
pub trait IngestObserver: Send + Sync {
    fn batch_finished(&self, outcome: &BatchOutcome);
}

/// Default sink; forwards outcomes to the log stream.
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn batch_finished(&self, outcome: &BatchOutcome) {
        match outcome.status {
            BatchStatus::Stored => info!(
                batch = outcome.batch,
                chunks = outcome.chunk_count,
                pre = outcome.pre_count,
                post = outcome.post_count,
                attempts = outcome.attempts,
                duration_ms = outcome.duration_ms,
                "batch stored"
            ),
            BatchStatus::Failed => warn!(
                batch = outcome.batch,
                chunks = outcome.chunk_count,
                attempts = outcome.attempts,
                duration_ms = outcome.duration_ms,
                "batch failed"
            ),
        }
    }
}
