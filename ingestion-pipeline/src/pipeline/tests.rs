use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex as StdMutex,
};

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::document::{ChunkMetadata, SourceDocument},
        vector::{SurrealVectorStore, VectorStore},
    },
    utils::config::AppConfig,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BatchIngestor, BatchOutcome, BatchStatus, IngestObserver, IngestionServices};

const TEST_DIMENSION: usize = 4;

struct FlatEmbeddings {
    calls: Mutex<Vec<usize>>,
}

impl FlatEmbeddings {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IngestionServices for FlatEmbeddings {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        self.calls.lock().await.push(texts.len());
        Ok(texts
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let mut vector = vec![0.0; TEST_DIMENSION];
                vector[index % TEST_DIMENSION] = 1.0;
                vector
            })
            .collect())
    }
}

/// Returns one embedding too few on the first call, then behaves.
struct ShortChangedOnce {
    inner: FlatEmbeddings,
    tripped: AtomicBool,
}

#[async_trait]
impl IngestionServices for ShortChangedOnce {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let mut embeddings = self.inner.embed_batch(texts).await?;
        if !self.tripped.swap(true, Ordering::SeqCst) {
            embeddings.pop();
        }
        Ok(embeddings)
    }
}

/// Fails a fixed number of calls with a transient error, then succeeds.
struct FlakyEmbeddings {
    inner: FlatEmbeddings,
    failures_left: AtomicUsize,
}

#[async_trait]
impl IngestionServices for FlakyEmbeddings {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Service("simulated embedding outage".into()));
        }
        self.inner.embed_batch(texts).await
    }
}

struct FailingEmbeddings;

#[async_trait]
impl IngestionServices for FailingEmbeddings {
    async fn embed_batch(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        Err(AppError::Service("embedding backend unavailable".into()))
    }
}

#[derive(Default)]
struct RecordingObserver {
    outcomes: StdMutex<Vec<BatchOutcome>>,
}

impl RecordingObserver {
    fn snapshot(&self) -> Vec<BatchOutcome> {
        self.outcomes.lock().expect("observer lock").clone()
    }
}

impl IngestObserver for RecordingObserver {
    fn batch_finished(&self, outcome: &BatchOutcome) {
        self.outcomes
            .lock()
            .expect("observer lock")
            .push(outcome.clone());
    }
}

#[allow(clippy::cast_possible_truncation)]
async fn memory_store() -> Arc<SurrealVectorStore> {
    let database = Uuid::new_v4().to_string();
    let db = SurrealDbClient::memory("ingestor_test", &database)
        .await
        .expect("Failed to create in-memory SurrealDB");
    Arc::new(SurrealVectorStore::new(db, "chunk", TEST_DIMENSION as u32))
}

fn document(origin: &str, text: &str) -> SourceDocument {
    SourceDocument {
        origin: origin.to_string(),
        text: text.to_string(),
        metadata: ChunkMetadata {
            entity: Some("Oracle Financial Services Software Ltd".to_string()),
            fiscal_period: Some("FY2023".to_string()),
            document_kind: "financial".to_string(),
            origin: origin.to_string(),
        },
    }
}

fn revenue_documents(count: usize) -> Vec<SourceDocument> {
    (0..count)
        .map(|index| {
            document(
                &format!("ofss/FY2023/row_{index:02}.txt"),
                &format!("Revenue line {index}: INR {index},000.00 million reported."),
            )
        })
        .collect()
}

fn ingestor(
    store: Arc<SurrealVectorStore>,
    services: Arc<dyn IngestionServices>,
    observer: Arc<RecordingObserver>,
    config: AppConfig,
) -> BatchIngestor {
    BatchIngestor::with_observer(store, services, observer, config)
}

#[tokio::test]
async fn test_fifty_chunks_into_empty_collection_are_all_stored() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let services = Arc::new(FlatEmbeddings::new());
    let ingestor = ingestor(
        store.clone(),
        services.clone(),
        observer.clone(),
        AppConfig::for_tests(),
    );

    let report = ingestor
        .run(revenue_documents(50), false)
        .await
        .expect("ingestion succeeds");

    let embed_calls = services.calls.lock().await.clone();
    assert_eq!(embed_calls, vec![50], "the whole batch embeds in one call");

    assert_eq!(report.processed_count, 50);
    assert_eq!(report.skipped_short_count, 0);
    assert_eq!(report.embedded_count, 50);
    assert_eq!(report.stored_count, 50);
    assert_eq!(report.final_collection_count, 50);
    assert!(report.failed_batch_ids.is_empty());

    let outcomes = observer.snapshot();
    assert_eq!(outcomes.len(), 1, "fifty chunks fit one default batch");
    assert_eq!(outcomes[0].batch, 1);
    assert_eq!(outcomes[0].chunk_count, 50);
    assert_eq!(outcomes[0].pre_count, 0);
    assert_eq!(outcomes[0].post_count, 50);
    assert_eq!(outcomes[0].status, BatchStatus::Stored);
    assert_eq!(outcomes[0].attempts, 2, "one embed call plus one upsert");
}

#[tokio::test]
async fn test_reingesting_the_same_documents_keeps_the_count_stable() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store.clone(),
        Arc::new(FlatEmbeddings::new()),
        observer.clone(),
        AppConfig::for_tests(),
    );

    let documents = revenue_documents(10);
    ingestor
        .run(documents.clone(), false)
        .await
        .expect("first run succeeds");
    let report = ingestor
        .run(documents, false)
        .await
        .expect("second run succeeds");

    assert_eq!(report.stored_count, 10);
    assert_eq!(report.final_collection_count, 10);

    let outcomes = observer.snapshot();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].pre_count, 10);
    assert_eq!(outcomes[1].post_count, 10, "overwrite leaves the count flat");
}

#[tokio::test]
async fn test_fresh_run_replaces_previously_stored_chunks() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store.clone(),
        Arc::new(FlatEmbeddings::new()),
        observer,
        AppConfig::for_tests(),
    );

    ingestor
        .run(revenue_documents(3), false)
        .await
        .expect("seed run succeeds");

    let replacement = vec![
        document(
            "ofss/FY2024/row_00.txt",
            "Revenue for FY2024 was INR 6,100.00 million.",
        ),
        document(
            "ofss/FY2024/row_01.txt",
            "Net income for FY2024 was INR 2,400.00 million.",
        ),
    ];
    let report = ingestor
        .run(replacement, true)
        .await
        .expect("fresh run succeeds");

    assert_eq!(report.final_collection_count, 2);
    assert_eq!(store.count().await.expect("count"), 2);
}

#[tokio::test]
async fn test_cardinality_mismatch_fails_the_batch_before_any_write() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let mut config = AppConfig::for_tests();
    config.batch_size = 1;
    let ingestor = ingestor(
        store.clone(),
        Arc::new(ShortChangedOnce {
            inner: FlatEmbeddings::new(),
            tripped: AtomicBool::new(false),
        }),
        observer.clone(),
        config,
    );

    let report = ingestor
        .run(revenue_documents(2), false)
        .await
        .expect("run tolerates one failed batch out of two");

    assert_eq!(report.failed_batch_ids, vec![1]);
    assert_eq!(report.failed_chunk_ids.len(), 1);
    assert_eq!(report.stored_count, 1);
    assert_eq!(
        store.count().await.expect("count"),
        1,
        "the mismatched batch must not reach the store"
    );

    let outcomes = observer.snapshot();
    assert_eq!(outcomes[0].status, BatchStatus::Failed);
    assert_eq!(outcomes[1].status, BatchStatus::Stored);
}

#[tokio::test]
async fn test_transient_embedding_failures_are_retried() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store.clone(),
        Arc::new(FlakyEmbeddings {
            inner: FlatEmbeddings::new(),
            failures_left: AtomicUsize::new(2),
        }),
        observer.clone(),
        AppConfig::for_tests(),
    );

    let report = ingestor
        .run(revenue_documents(5), false)
        .await
        .expect("retries recover the batch");

    assert!(report.failed_batch_ids.is_empty());
    assert_eq!(report.stored_count, 5);

    let outcomes = observer.snapshot();
    assert_eq!(
        outcomes[0].attempts, 4,
        "two failed embed calls, one good one, one upsert"
    );
}

#[tokio::test]
async fn test_run_aborts_when_every_batch_fails() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store,
        Arc::new(FailingEmbeddings),
        observer.clone(),
        AppConfig::for_tests(),
    );

    let result = ingestor.run(revenue_documents(1), false).await;

    let err = result.expect_err("all batches failing must abort the run");
    assert!(matches!(err, AppError::Processing(_)));
    assert!(err.to_string().contains("exceeding the permitted ratio"));

    let outcomes = observer.snapshot();
    assert_eq!(outcomes[0].status, BatchStatus::Failed);
    assert_eq!(outcomes[0].attempts, 3, "transient errors retry to exhaustion");
}

#[tokio::test]
async fn test_short_chunks_are_dropped_and_counted() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store,
        Arc::new(FlatEmbeddings::new()),
        observer,
        AppConfig::for_tests(),
    );

    let documents = vec![
        document("ofss/FY2023/tiny.txt", "Too small."),
        document(
            "ofss/FY2023/row_00.txt",
            "Revenue line 0: INR 5,698.00 million reported.",
        ),
    ];
    let report = ingestor
        .run(documents, false)
        .await
        .expect("run succeeds");

    assert_eq!(report.skipped_short_count, 1);
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.stored_count, 1);
}

#[tokio::test]
async fn test_empty_document_set_reports_zeroes() {
    let store = memory_store().await;
    let observer = Arc::new(RecordingObserver::default());
    let ingestor = ingestor(
        store,
        Arc::new(FlatEmbeddings::new()),
        observer.clone(),
        AppConfig::for_tests(),
    );

    let report = ingestor.run(Vec::new(), false).await.expect("run succeeds");

    assert_eq!(report.processed_count, 0);
    assert_eq!(report.stored_count, 0);
    assert_eq!(report.final_collection_count, 0);
    assert!(observer.snapshot().is_empty());
}
