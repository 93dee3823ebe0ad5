
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub pinecone: PineconeConfig,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            pinecone: PineconeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for uploads, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_mb: 25,
        }
    }
}

impl ServerConfig {
    #[inline]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where uploaded files are written before extraction.
    pub upload_dir: PathBuf,
    /// Keep uploaded files after successful ingestion. Files are always
    /// kept when ingestion fails so the input can be inspected.
    pub retain_uploads: bool,
}

impl Default for StorageConfig {
    #[inline]
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            retain_uploads: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    /// Dimension of the embedding vectors. Must match the vector index;
    /// the index is created with this dimension at startup.
    pub dimension: u32,
    pub api_key: String,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_key: String,
}

impl Default for LlmConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_key: String,
    /// Control-plane endpoint used to list/create indexes.
    pub control_plane_url: String,
    pub index_name: String,
    pub cloud: String,
    pub region: String,
    /// Data-plane host for the index. Resolved from the control plane at
    /// startup when not set.
    pub index_host: Option<String>,
}

impl Default for PineconeConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            index_name: "ragbot".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            index_host: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid separator: cannot be empty")]
    EmptySeparator,
    #[error("Invalid embedding dimension: {0} (must be between 1 and 8192)")]
    InvalidDimension(u32),
    #[error("Invalid model name: cannot be empty")]
    EmptyModel,
    #[error("Invalid index name: cannot be empty")]
    EmptyIndexName,
    #[error("Invalid upload limit: {0} MB (must be between 1 and 1024)")]
    InvalidUploadLimit(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist. API keys are taken from the environment
    /// when the corresponding variables are set.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Override secrets from the environment. `OPENAI_API_KEY` covers both
    /// provider adapters unless a more specific variable is set.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.embedding.api_key.is_empty() {
                self.embedding.api_key = key.clone();
            }
            if self.llm.api_key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = key;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            self.pinecone.api_key = key;
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1024).contains(&self.server.max_upload_mb) {
            return Err(ConfigError::InvalidUploadLimit(self.server.max_upload_mb));
        }

        let chunking = &self.chunking;
        if !(1..=100_000).contains(&chunking.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(chunking.chunk_size));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                chunking.chunk_overlap,
                chunking.chunk_size,
            ));
        }
        if chunking.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }

        if !(1..=8192).contains(&self.embedding.dimension) {
            return Err(ConfigError::InvalidDimension(self.embedding.dimension));
        }
        if self.embedding.model.trim().is_empty() || self.llm.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.pinecone.index_name.trim().is_empty() {
            return Err(ConfigError::EmptyIndexName);
        }

        for url in [
            &self.embedding.base_url,
            &self.llm.base_url,
            &self.pinecone.control_plane_url,
        ] {
            Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }

        Ok(())
    }
}

/// Print the effective configuration with secrets masked.
#[inline]
pub fn show_config(config: &Config) {
    let mut masked = config.clone();
    for key in [
        &mut masked.embedding.api_key,
        &mut masked.llm.api_key,
        &mut masked.pinecone.api_key,
    ] {
        if !key.is_empty() {
            *key = "********".to_string();
        }
    }

    match toml::to_string_pretty(&masked) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("Failed to render configuration: {e}"),
    }
}
