use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    Hashed,
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::OpenAI
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    // Required settings default to empty rather than failing deserialization;
    // `validate()` collects the gaps so serve mode can start degraded and
    // report them through the health probe.
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub surrealdb_address: String,
    #[serde(default)]
    pub surrealdb_username: String,
    #[serde(default)]
    pub surrealdb_password: String,
    #[serde(default)]
    pub surrealdb_namespace: String,
    #[serde(default)]
    pub surrealdb_database: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    /// When set, `/query` requires this key in the `x-api-key` header.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_upsert_attempts")]
    pub upsert_attempts: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_delete_propagation_secs")]
    pub delete_propagation_secs: u64,
    #[serde(default = "default_max_failed_batch_ratio")]
    pub max_failed_batch_ratio: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_filtered_top_k")]
    pub filtered_top_k: usize,
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_http_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_collection() -> String {
    "financial_documents".to_string()
}

fn default_documents_dir() -> String {
    "./data/documents".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_min_chunk_chars() -> usize {
    20
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_upsert_attempts() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_delete_propagation_secs() -> u64 {
    3
}

fn default_max_failed_batch_ratio() -> f64 {
    0.5
}

fn default_top_k() -> usize {
    10
}

fn default_filtered_top_k() -> usize {
    5
}

fn default_relevance_floor() -> f32 {
    0.35
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Collects configuration problems instead of failing on the first one,
    /// so startup can log all of them at once.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.openai_api_key.trim().is_empty()
            && self.embedding_backend == EmbeddingBackend::OpenAI
        {
            issues.push("openai_api_key is not set".to_string());
        }
        if self.surrealdb_address.trim().is_empty() {
            issues.push("surrealdb_address is not set".to_string());
        }
        for (name, value) in [
            ("surrealdb_username", &self.surrealdb_username),
            ("surrealdb_password", &self.surrealdb_password),
            ("surrealdb_namespace", &self.surrealdb_namespace),
            ("surrealdb_database", &self.surrealdb_database),
        ] {
            if value.trim().is_empty() {
                issues.push(format!("{name} is not set"));
            }
        }
        if self.collection.trim().is_empty() {
            issues.push("collection name is empty".to_string());
        }
        if self.embedding_dimensions == 0 {
            issues.push("embedding_dimensions must be greater than zero".to_string());
        }
        if self.batch_size == 0 {
            issues.push("batch_size must be greater than zero".to_string());
        }
        if self.chunk_size == 0 {
            issues.push("chunk_size must be greater than zero".to_string());
        }
        // Same bound the chunker enforces: the overlap has to fit under the
        // capacity floor of half the chunk size.
        if self.chunk_overlap >= self.chunk_size / 2 {
            issues.push(format!(
                "chunk_overlap ({}) must be smaller than half of chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.upsert_attempts == 0 {
            issues.push("upsert_attempts must be at least one".to_string());
        }
        if !(0.0..=1.0).contains(&self.max_failed_batch_ratio) {
            issues.push(format!(
                "max_failed_batch_ratio ({}) must lie within [0, 1]",
                self.max_failed_batch_ratio
            ));
        }
        if self.top_k == 0 {
            issues.push("top_k must be greater than zero".to_string());
        }
        if self.filtered_top_k == 0 || self.filtered_top_k > self.top_k {
            issues.push(format!(
                "filtered_top_k ({}) must lie within [1, top_k]",
                self.filtered_top_k
            ));
        }
        if !(0.0..=1.0).contains(&self.relevance_floor) {
            issues.push(format!(
                "relevance_floor ({}) must lie within [0, 1]",
                self.relevance_floor
            ));
        }

        issues
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(any(test, feature = "test-utils"))]
impl AppConfig {
    /// Config for tests: hashed embeddings, small dimension, no network.
    pub fn for_tests() -> Self {
        AppConfig {
            openai_api_key: "test-key".to_string(),
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "test".to_string(),
            surrealdb_database: "test".to_string(),
            http_port: default_http_port(),
            openai_base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: 384,
            embedding_backend: EmbeddingBackend::Hashed,
            collection: default_collection(),
            documents_dir: default_documents_dir(),
            api_key: None,
            batch_size: default_batch_size(),
            min_chunk_chars: default_min_chunk_chars(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            upsert_attempts: default_upsert_attempts(),
            retry_base_delay_ms: 1,
            delete_propagation_secs: 0,
            max_failed_batch_ratio: default_max_failed_batch_ratio(),
            top_k: default_top_k(),
            filtered_top_k: default_filtered_top_k(),
            relevance_floor: default_relevance_floor(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
