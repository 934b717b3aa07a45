use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::storage::types::chunk::ChunkRecord;
use crate::storage::types::deserialize_flexible_id;
use crate::storage::types::document::ChunkMetadata;

/// Search width passed to the KNN operator.
const KNN_EF: usize = 40;

/// A scored chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    pub chunk_id: String,
    /// Cosine similarity in `[0, 1]`, the complement of the index distance.
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl RetrievedMatch {
    pub fn citation(&self) -> String {
        self.metadata.citation()
    }
}

/// The single interface the pipelines use to talk to the vector store.
///
/// `upsert` expects the four column vectors to have equal length; the
/// ingestor verifies cardinality before any write reaches an adapter.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent collection setup, safe to call on every start.
    async fn get_or_create_collection(&self) -> Result<(), AppError>;

    /// Insert-or-overwrite by chunk id.
    async fn upsert(
        &self,
        ids: Vec<String>,
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<(), AppError>;

    /// KNN search ordered by descending similarity, optionally restricted to
    /// one fiscal period.
    async fn query(
        &self,
        embedding: Vec<f32>,
        k: usize,
        fiscal_period: Option<String>,
    ) -> Result<Vec<RetrievedMatch>, AppError>;

    async fn count(&self) -> Result<usize, AppError>;

    async fn delete_all(&self) -> Result<(), AppError>;
}

/// Maps the store interface onto one SurrealDB table with an HNSW index over
/// the embedding field.
pub struct SurrealVectorStore {
    db: SurrealDbClient,
    table: String,
    dimension: u32,
}

impl SurrealVectorStore {
    pub fn new(db: SurrealDbClient, table: &str, dimension: u32) -> Self {
        SurrealVectorStore {
            db,
            table: table.to_string(),
            dimension,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoredRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    id: String,
    text: String,
    entity: Option<String>,
    fiscal_period: Option<String>,
    document_kind: String,
    origin: String,
    distance: f32,
}

impl ScoredRow {
    fn into_match(self) -> RetrievedMatch {
        RetrievedMatch {
            chunk_id: self.id,
            score: similarity_from_distance(self.distance),
            text: self.text,
            metadata: ChunkMetadata {
                entity: self.entity,
                fiscal_period: self.fiscal_period,
                document_kind: self.document_kind,
                origin: self.origin,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// The index reports cosine distance; similarity is its complement, clamped
/// against float drift.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

#[async_trait]
impl VectorStore for SurrealVectorStore {
    async fn get_or_create_collection(&self) -> Result<(), AppError> {
        let table = &self.table;
        self.db
            .query(format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;"))
            .await?;
        self.db
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_{table} ON TABLE {table} \
                 FIELDS embedding HNSW DIMENSION {dimension} DIST COSINE TYPE F32;",
                dimension = self.dimension,
            ))
            .await?;

        Ok(())
    }

    async fn upsert(
        &self,
        ids: Vec<String>,
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<(), AppError> {
        let rows = ids.into_iter().zip(texts).zip(embeddings).zip(metadatas);
        for (((id, text), embedding), metadata) in rows {
            let record = ChunkRecord::new(id.clone(), text, embedding, metadata);
            let _: Option<ChunkRecord> = self
                .db
                .upsert((self.table.as_str(), id.as_str()))
                .content(record)
                .await?;
        }

        Ok(())
    }

    async fn query(
        &self,
        embedding: Vec<f32>,
        k: usize,
        fiscal_period: Option<String>,
    ) -> Result<Vec<RetrievedMatch>, AppError> {
        let table = &self.table;
        let sql = if fiscal_period.is_some() {
            format!(
                "SELECT *, vector::distance::knn() AS distance FROM {table} \
                 WHERE fiscal_period = $period AND embedding <|{k},{KNN_EF}|> {embedding:?} \
                 ORDER BY distance"
            )
        } else {
            format!(
                "SELECT *, vector::distance::knn() AS distance FROM {table} \
                 WHERE embedding <|{k},{KNN_EF}|> {embedding:?} \
                 ORDER BY distance"
            )
        };

        let mut response = match fiscal_period {
            Some(period) => self.db.query(sql).bind(("period", period)).await?,
            None => self.db.query(sql).await?,
        };
        let rows: Vec<ScoredRow> = response.take(0)?;

        Ok(rows.into_iter().map(ScoredRow::into_match).collect())
    }

    async fn count(&self) -> Result<usize, AppError> {
        let mut response = self
            .db
            .query(format!(
                "SELECT count() AS count FROM {table} GROUP ALL;",
                table = self.table
            ))
            .await?;
        let rows: Vec<CountRow> = response.take(0)?;

        Ok(rows.first().map_or(0, |row| row.count as usize))
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        let _: Vec<ChunkRecord> = self.db.delete(self.table.as_str()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::chunk::derive_chunk_id;
    use uuid::Uuid;

    async fn memory_store() -> SurrealVectorStore {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store = SurrealVectorStore::new(db, "chunk", 4);
        store
            .get_or_create_collection()
            .await
            .expect("Failed to set up collection");
        store
    }

    fn metadata(period: Option<&str>, origin: &str) -> ChunkMetadata {
        ChunkMetadata {
            entity: Some("Oracle Financial Services Software Ltd".to_string()),
            fiscal_period: period.map(str::to_string),
            document_kind: "financial".to_string(),
            origin: origin.to_string(),
        }
    }

    async fn seed(store: &SurrealVectorStore) {
        let origin = "ofss/FY2022/report.txt";
        store
            .upsert(
                vec![
                    derive_chunk_id(origin, 0),
                    derive_chunk_id(origin, 900),
                    derive_chunk_id(origin, 1800),
                ],
                vec![
                    "Revenue for FY2022 was 51 billion INR.".to_string(),
                    "Net income grew over the prior year.".to_string(),
                    "Board remuneration details.".to_string(),
                ],
                vec![
                    vec![1.0, 0.0, 0.0, 0.0],
                    vec![0.6, 0.8, 0.0, 0.0],
                    vec![0.0, 0.0, 1.0, 0.0],
                ],
                vec![
                    metadata(Some("FY2022"), origin),
                    metadata(Some("FY2022"), origin),
                    metadata(None, "notes/board.txt"),
                ],
            )
            .await
            .expect("Failed to upsert");
    }

    #[tokio::test]
    async fn test_upsert_same_ids_leaves_count_unchanged() {
        let store = memory_store().await;

        seed(&store).await;
        assert_eq!(store.count().await.expect("Failed to count"), 3);

        seed(&store).await;
        assert_eq!(store.count().await.expect("Failed to count"), 3);
    }

    #[tokio::test]
    async fn test_query_orders_matches_by_similarity() {
        let store = memory_store().await;
        seed(&store).await;

        let matches = store
            .query(vec![1.0, 0.0, 0.0, 0.0], 3, None)
            .await
            .expect("Failed to query");

        assert_eq!(matches.len(), 3);
        assert!(matches[0].score >= matches[1].score);
        assert!(matches[1].score >= matches[2].score);
        assert_eq!(matches[0].text, "Revenue for FY2022 was 51 billion INR.");
        assert!(matches[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_query_with_period_filter_excludes_other_records() {
        let store = memory_store().await;
        seed(&store).await;

        let matches = store
            .query(vec![0.0, 0.0, 1.0, 0.0], 3, Some("FY2022".to_string()))
            .await
            .expect("Failed to query");

        assert_eq!(matches.len(), 2);
        assert!(matches
            .iter()
            .all(|m| m.metadata.fiscal_period.as_deref() == Some("FY2022")));
    }

    #[tokio::test]
    async fn test_delete_all_resets_count() {
        let store = memory_store().await;
        seed(&store).await;

        store.delete_all().await.expect("Failed to delete");

        assert_eq!(store.count().await.expect("Failed to count"), 0);
    }

    #[tokio::test]
    async fn test_count_on_missing_table_is_zero() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store = SurrealVectorStore::new(db, "chunk", 4);

        assert_eq!(store.count().await.expect("Failed to count"), 0);
    }

    #[test]
    fn test_similarity_is_clamped() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.0);
        assert_eq!(similarity_from_distance(1.5), 0.0);
        assert_eq!(similarity_from_distance(-0.25), 1.0);
    }
}
