mod observer;
mod report;
mod services;

pub use observer::{BatchOutcome, BatchStatus, IngestObserver, TracingObserver};
pub use report::IngestionReport;
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultIngestionServices, IngestionServices};

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        types::{chunk::Chunk, document::SourceDocument},
        vector::VectorStore,
    },
    utils::config::AppConfig,
};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{info, warn};

use crate::chunker::Chunker;

struct BatchCounts {
    embedded: usize,
    pre: usize,
    post: usize,
}

/// Drives chunks into the vector store batch by batch.
///
/// Batches are written strictly sequentially against the collection, so the
/// count read before and after each upsert is meaningful. A failed batch is
/// recorded and skipped; the remaining batches still run.
pub struct BatchIngestor {
    store: Arc<dyn VectorStore>,
    services: Arc<dyn IngestionServices>,
    observer: Arc<dyn IngestObserver>,
    config: AppConfig,
}

impl BatchIngestor {
    pub fn new(
        store: Arc<dyn VectorStore>,
        services: Arc<dyn IngestionServices>,
        config: AppConfig,
    ) -> Self {
        Self::with_observer(store, services, Arc::new(TracingObserver), config)
    }

    pub fn with_observer(
        store: Arc<dyn VectorStore>,
        services: Arc<dyn IngestionServices>,
        observer: Arc<dyn IngestObserver>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            services,
            observer,
            config,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[tracing::instrument(skip_all, fields(documents = documents.len(), fresh))]
    pub async fn run(
        &self,
        documents: Vec<SourceDocument>,
        fresh: bool,
    ) -> Result<IngestionReport, AppError> {
        if documents.is_empty() {
            warn!("no documents to ingest");
        }

        self.store.get_or_create_collection().await?;

        if fresh {
            info!(
                delay_secs = self.config.delete_propagation_secs,
                "fresh run; clearing the collection before the first write"
            );
            self.store.delete_all().await?;
            // The store applies deletes eventually; writing immediately after
            // the delete risks the delete landing on top of the new data.
            tokio::time::sleep(Duration::from_secs(self.config.delete_propagation_secs)).await;
        }

        let chunker = Chunker::new(
            self.config.chunk_size,
            self.config.chunk_overlap,
            self.config.min_chunk_chars,
        )?;
        let split = chunker.split_documents(&documents)?;
        if split.skipped_short > 0 {
            info!(
                skipped = split.skipped_short,
                min_chars = self.config.min_chunk_chars,
                "dropped chunks below the minimum length"
            );
        }

        let mut report = IngestionReport {
            processed_count: split.chunks.len(),
            skipped_short_count: split.skipped_short,
            ..IngestionReport::default()
        };

        let batches: Vec<&[Chunk]> = split.chunks.chunks(self.config.batch_size).collect();
        let total_batches = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let number = index + 1;
            let attempts = AtomicUsize::new(0);
            let started = Instant::now();

            match self.ingest_batch(number, batch, &attempts).await {
                Ok(counts) => {
                    let delta = counts.post.saturating_sub(counts.pre);
                    if delta < batch.len() {
                        warn!(
                            batch = number,
                            expected = batch.len(),
                            delta,
                            pre = counts.pre,
                            post = counts.post,
                            "collection grew by less than the batch size; existing ids were overwritten"
                        );
                    }
                    report.embedded_count += counts.embedded;
                    report.stored_count += batch.len();
                    self.observer.batch_finished(&BatchOutcome {
                        batch: number,
                        chunk_count: batch.len(),
                        pre_count: counts.pre,
                        post_count: counts.post,
                        attempts: attempts.load(Ordering::Relaxed),
                        status: BatchStatus::Stored,
                        duration_ms: duration_millis(started.elapsed()),
                    });
                }
                Err(err) => {
                    warn!(
                        batch = number,
                        error = %err,
                        "batch failed; continuing with the next batch"
                    );
                    report.failed_batch_ids.push(number);
                    report
                        .failed_chunk_ids
                        .extend(batch.iter().map(|chunk| chunk.chunk_id.clone()));
                    self.observer.batch_finished(&BatchOutcome {
                        batch: number,
                        chunk_count: batch.len(),
                        pre_count: 0,
                        post_count: 0,
                        attempts: attempts.load(Ordering::Relaxed),
                        status: BatchStatus::Failed,
                        duration_ms: duration_millis(started.elapsed()),
                    });
                }
            }
        }

        report.final_collection_count = self.store.count().await?;
        info!(
            processed = report.processed_count,
            skipped_short = report.skipped_short_count,
            embedded = report.embedded_count,
            stored = report.stored_count,
            collection_count = report.final_collection_count,
            failed_batches = report.failed_batch_ids.len(),
            "ingestion run complete"
        );

        if total_batches > 0 {
            let failed_ratio = report.failed_batch_ids.len() as f64 / total_batches as f64;
            if failed_ratio > self.config.max_failed_batch_ratio {
                return Err(AppError::Processing(format!(
                    "{} of {total_batches} batches failed, exceeding the permitted ratio of {}",
                    report.failed_batch_ids.len(),
                    self.config.max_failed_batch_ratio
                )));
            }
        }

        Ok(report)
    }

    async fn ingest_batch(
        &self,
        number: usize,
        batch: &[Chunk],
        attempts: &AtomicUsize,
    ) -> Result<BatchCounts, AppError> {
        let ids: Vec<String> = batch.iter().map(|chunk| chunk.chunk_id.clone()).collect();
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let metadatas: Vec<_> = batch.iter().map(|chunk| chunk.metadata.clone()).collect();

        let embeddings = self
            .with_retry(attempts, || self.services.embed_batch(texts.clone()))
            .await?;

        // Every column must line up before anything reaches the store; a
        // mismatch here would otherwise write rows with the wrong vectors.
        if ids.len() != texts.len()
            || texts.len() != embeddings.len()
            || embeddings.len() != metadatas.len()
        {
            return Err(AppError::Cardinality {
                batch: number,
                ids: ids.len(),
                texts: texts.len(),
                embeddings: embeddings.len(),
                metadatas: metadatas.len(),
            });
        }

        let embedded = embeddings.len();
        let pre = self.store.count().await?;
        self.with_retry(attempts, || {
            self.store.upsert(
                ids.clone(),
                texts.clone(),
                embeddings.clone(),
                metadatas.clone(),
            )
        })
        .await?;
        let post = self.store.count().await?;

        Ok(BatchCounts {
            embedded,
            pre,
            post,
        })
    }

    async fn with_retry<T, A, F>(
        &self,
        attempts: &AtomicUsize,
        mut action: A,
    ) -> Result<T, AppError>
    where
        A: FnMut() -> F,
        F: std::future::Future<Output = Result<T, AppError>>,
    {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_base_delay_ms)
            .map(jitter)
            .take(self.config.upsert_attempts.saturating_sub(1));

        RetryIf::spawn(
            retry_strategy,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                action()
            },
            AppError::is_transient,
        )
        .await
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests;
