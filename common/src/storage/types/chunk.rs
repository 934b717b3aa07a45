use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::document::ChunkMetadata;
use super::{deserialize_datetime, deserialize_flexible_id, serialize_datetime};

/// A span of document text on its way into the store. The ingestor embeds
/// chunk texts batch-wise and hands ids, texts, embeddings and metadata to
/// the store as parallel columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    /// Byte offset of the span within its source document.
    pub offset: usize,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: String, offset: usize, metadata: ChunkMetadata) -> Self {
        Chunk {
            chunk_id: derive_chunk_id(&metadata.origin, offset),
            text,
            offset,
            metadata,
        }
    }
}

/// First 32 hex characters of `sha256("{origin}:{offset}")`. Chunking the
/// same input again reproduces the same ids, so repeated ingestion overwrites
/// records instead of duplicating them.
pub fn derive_chunk_id(origin: &str, offset: usize) -> String {
    let digest = Sha256::digest(format!("{origin}:{offset}").as_bytes());
    let mut id = format!("{digest:x}");
    id.truncate(32);
    id
}

/// The shape of a chunk as stored in SurrealDB, one record per chunk id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub entity: Option<String>,
    pub fiscal_period: Option<String>,
    pub document_kind: String,
    pub origin: String,
    #[serde(
        serialize_with = "serialize_datetime",
        deserialize_with = "deserialize_datetime",
        default
    )]
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn new(id: String, text: String, embedding: Vec<f32>, metadata: ChunkMetadata) -> Self {
        ChunkRecord {
            id,
            text,
            embedding,
            entity: metadata.entity,
            fiscal_period: metadata.fiscal_period,
            document_kind: metadata.document_kind,
            origin: metadata.origin,
            created_at: Utc::now(),
        }
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            entity: self.entity.clone(),
            fiscal_period: self.fiscal_period.clone(),
            document_kind: self.document_kind.clone(),
            origin: self.origin.clone(),
        }
    }
}
