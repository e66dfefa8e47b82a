//! TOML configuration.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! Credentials are never read from the file: `JINA_API_KEY` and
//! `QDRANT_API_KEY` come from the environment, and `QDRANT_URL` overrides
//! `[vector_store].url` when set.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./config/lead-ingest.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: default_input_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_input_root() -> PathBuf {
    PathBuf::from("./data")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.csv".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./.upload-checkpoint.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}
fn default_max_concurrency() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_passage_task")]
    pub passage_task: String,
    #[serde(default = "default_query_task")]
    pub query_task: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            url: default_embedding_url(),
            passage_task: default_passage_task(),
            query_task: default_query_task(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "jina".to_string()
}
fn default_embedding_model() -> String {
    "jina-embeddings-v3".to_string()
}
fn default_dims() -> usize {
    128
}
fn default_embedding_url() -> String {
    "https://api.jina.ai/v1/embeddings".to_string()
}
fn default_passage_task() -> String {
    "retrieval.passage".to_string()
}
fn default_query_task() -> String {
    "retrieval.query".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_model")]
    pub model: String,
    #[serde(default = "default_rerank_url")]
    pub url: String,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            model: default_rerank_model(),
            url: default_rerank_url(),
        }
    }
}

fn default_rerank_model() -> String {
    "jina-reranker-v2-base-multilingual".to_string()
}
fn default_rerank_url() -> String {
    "https://api.jina.ai/v1/rerank".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_true")]
    pub on_disk: bool,
    #[serde(default = "default_true")]
    pub quantization: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_qdrant_url(),
            collection: default_collection(),
            on_disk: true,
            quantization: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend() -> String {
    "qdrant".to_string()
}
fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "people".to_string()
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("QDRANT_URL").filter(|u| !u.trim().is_empty()) {
            self.vector_store.url = url;
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn validate(&self) -> Result<()> {
        if self.batching.batch_size == 0 {
            anyhow::bail!("batching.batch_size must be > 0");
        }
        if self.batching.max_concurrency == 0 {
            anyhow::bail!("batching.max_concurrency must be > 0");
        }
        if self.embedding.dims == 0 {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if self.vector_store.collection.trim().is_empty() {
            anyhow::bail!("vector_store.collection must not be empty");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "jina" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be disabled or jina.",
                other
            ),
        }

        match self.vector_store.backend.as_str() {
            "qdrant" | "memory" => {}
            other => anyhow::bail!(
                "Unknown vector store backend: '{}'. Must be qdrant or memory.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Load an explicitly requested config file, or fall back to the default
/// path and then to built-in defaults when no file is present.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return load_config(default_path);
    }
    tracing::debug!("no config file at {}, using defaults", DEFAULT_CONFIG_PATH);
    let mut config = Config::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
