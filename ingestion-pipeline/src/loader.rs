use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::types::document::{ChunkMetadata, SourceDocument},
    utils::{
        config::AppConfig,
        finance::{canonical_entity, normalize_fiscal_period},
    },
};
use futures::TryStreamExt;
use object_store::{local::LocalFileSystem, path::Path, ObjectStore};
use tracing::{debug, warn};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Produces the documents in scope for one ingestion run, in a stable order.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load_documents(&self) -> Result<Vec<SourceDocument>, AppError>;
}

/// Reads plain-text documents out of an `object_store` backend, one document
/// per object.
///
/// Metadata comes from the object path: the first segment names the entity,
/// and any segment carrying a year sets the fiscal period. An object named
/// `oracle_financial_services/FY2023_income.txt` therefore lands with the
/// canonical entity name and fiscal period `FY2023` already attached.
pub struct ObjectStoreLoader {
    store: Arc<dyn ObjectStore>,
    prefix: Option<Path>,
}

impl ObjectStoreLoader {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<Path>) -> Self {
        Self { store, prefix }
    }

    /// Builds a loader over the configured documents directory, creating the
    /// directory when it does not exist yet.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let base = std::path::Path::new(&config.documents_dir);
        if !base.exists() {
            tokio::fs::create_dir_all(base).await?;
        }
        let store = LocalFileSystem::new_with_prefix(base)?;
        Ok(Self::new(Arc::new(store), None))
    }
}

#[async_trait]
impl DocumentLoader for ObjectStoreLoader {
    async fn load_documents(&self) -> Result<Vec<SourceDocument>, AppError> {
        let mut objects = self
            .store
            .list(self.prefix.as_ref())
            .try_collect::<Vec<_>>()
            .await?;
        // Listing order is backend-specific; sort so reruns see the same sequence.
        objects.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));

        let mut documents = Vec::new();
        for object in objects {
            if !has_supported_extension(&object.location) {
                continue;
            }

            let payload = self.store.get(&object.location).await?.bytes().await?;
            let text = match String::from_utf8(payload.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!(object = %object.location, "skipping object with non-UTF-8 content");
                    continue;
                }
            };

            let metadata = metadata_from_path(&object.location);
            debug!(
                origin = %object.location,
                entity = ?metadata.entity,
                fiscal_period = ?metadata.fiscal_period,
                "loaded document"
            );
            documents.push(SourceDocument {
                origin: object.location.to_string(),
                text,
                metadata,
            });
        }

        Ok(documents)
    }
}

fn has_supported_extension(location: &Path) -> bool {
    location
        .extension()
        .is_some_and(|extension| SUPPORTED_EXTENSIONS.contains(&extension))
}

fn metadata_from_path(location: &Path) -> ChunkMetadata {
    let segments: Vec<String> = location
        .parts()
        .map(|part| part.as_ref().to_string())
        .collect();

    // A bare top-level file has no directory segment to name an entity.
    let entity = if segments.len() > 1 {
        let cleaned = segments[0].replace(['_', '-'], " ");
        canonical_entity(&cleaned).or(Some(cleaned))
    } else {
        None
    };

    let fiscal_period = segments
        .iter()
        .find_map(|segment| normalize_fiscal_period(segment));

    let document_kind = if fiscal_period.is_some() {
        "financial".to_string()
    } else {
        "text".to_string()
    };

    ChunkMetadata {
        entity,
        fiscal_period,
        document_kind,
        origin: location.to_string(),
    }
}
