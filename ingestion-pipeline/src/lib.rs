#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::{Chunker, SplitOutcome};
pub use loader::{DocumentLoader, ObjectStoreLoader};
pub use pipeline::{
    BatchIngestor, BatchOutcome, BatchStatus, DefaultIngestionServices, IngestObserver,
    IngestionReport, IngestionServices, TracingObserver,
};

use common::error::AppError;
use tracing::info;

/// Loads every document in scope and runs them through the batch ingestor.
pub async fn run_ingestion(
    loader: &dyn DocumentLoader,
    ingestor: &BatchIngestor,
    fresh: bool,
) -> Result<IngestionReport, AppError> {
    let documents = loader.load_documents().await?;
    info!(
        documents = documents.len(),
        fresh, "loaded documents for ingestion"
    );
    ingestor.run(documents, fresh).await
}
