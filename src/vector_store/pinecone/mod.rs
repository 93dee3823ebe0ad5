
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ChunkMetadata, ScoredChunk, VectorEntry, VectorIndex};
use crate::config::PineconeConfig;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const INDEX_METRIC: &str = "cosine";

/// Client for a Pinecone-style managed vector index.
///
/// Index creation and host resolution happen once at startup via
/// [`PineconeStore::connect`]; request handling only touches the data
/// plane.
#[derive(Debug, Clone)]
pub struct PineconeStore {
    client: Client,
    api_key: String,
    index_host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    host: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest {
    name: String,
    dimension: u32,
    metric: String,
    spec: IndexSpec,
}

#[derive(Debug, Serialize)]
struct IndexSpec {
    serverless: ServerlessSpec,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec {
    cloud: String,
    region: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    vectors: Vec<VectorEntry>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount")]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    score: f32,
    metadata: Option<ChunkMetadata>,
}

impl PineconeStore {
    /// Connect to the configured index, creating it when absent.
    ///
    /// Idempotent: an existing index with the configured name is reused
    /// as-is. When `index_host` is set in the configuration the control
    /// plane is skipped entirely.
    #[inline]
    pub async fn connect(config: &PineconeConfig, dimension: u32) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::Config(
                "Pinecone API key is not set (PINECONE_API_KEY)".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        let index_host = match &config.index_host {
            Some(host) => host.clone(),
            None => ensure_index(&client, config, dimension).await?,
        };

        info!(
            "Vector index '{}' ready at {}",
            config.index_name, index_host
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            index_host,
        })
    }

    fn data_plane_url(&self, path: &str) -> String {
        if self.index_host.contains("://") {
            format!("{}{path}", self.index_host.trim_end_matches('/'))
        } else {
            format!("https://{}{path}", self.index_host)
        }
    }
}

/// Look up the index on the control plane and create it when missing,
/// returning the data-plane host.
async fn ensure_index(
    client: &Client,
    config: &PineconeConfig,
    dimension: u32,
) -> Result<String> {
    let base = config.control_plane_url.trim_end_matches('/');

    let response = client
        .get(format!("{base}/indexes"))
        .header("Api-Key", &config.api_key)
        .send()
        .await
        .map_err(|e| RagError::VectorStore(format!("failed to list indexes: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::VectorStore(format!(
            "listing indexes returned {status}: {body}"
        )));
    }

    let list: IndexList = response
        .json()
        .await
        .map_err(|e| RagError::VectorStore(format!("invalid index list response: {e}")))?;

    if let Some(existing) = list.indexes.into_iter().find(|i| i.name == config.index_name) {
        debug!("Index '{}' already exists", config.index_name);
        return existing.host.ok_or_else(|| {
            RagError::VectorStore(format!(
                "index '{}' has no data-plane host yet",
                config.index_name
            ))
        });
    }

    info!(
        "Creating index '{}' (dimension {}, metric {})",
        config.index_name, dimension, INDEX_METRIC
    );

    let request = CreateIndexRequest {
        name: config.index_name.clone(),
        dimension,
        metric: INDEX_METRIC.to_string(),
        spec: IndexSpec {
            serverless: ServerlessSpec {
                cloud: config.cloud.clone(),
                region: config.region.clone(),
            },
        },
    };

    let response = client
        .post(format!("{base}/indexes"))
        .header("Api-Key", &config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| RagError::VectorStore(format!("failed to create index: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::VectorStore(format!(
            "creating index returned {status}: {body}"
        )));
    }

    let created: IndexDescription = response
        .json()
        .await
        .map_err(|e| RagError::VectorStore(format!("invalid create index response: {e}")))?;

    created.host.ok_or_else(|| {
        RagError::VectorStore(format!(
            "created index '{}' without a data-plane host",
            config.index_name
        ))
    })
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<usize> {
        if entries.is_empty() {
            debug!("No entries to upsert");
            return Ok(0);
        }

        debug!("Upserting batch of {} entries", entries.len());

        let request = UpsertRequest { vectors: entries };
        let response = self
            .client
            .post(self.data_plane_url("/vectors/upsert"))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::VectorStore(format!("upsert request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStore(format!(
                "upsert returned {status}: {body}"
            )));
        }

        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| RagError::VectorStore(format!("invalid upsert response: {e}")))?;

        info!("Stored {} vector entries", parsed.upserted_count);
        Ok(parsed.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        debug!("Querying index for top {} matches", top_k);

        let request = QueryRequest {
            vector: vector.to_vec(),
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(self.data_plane_url("/query"))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::VectorStore(format!("query request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStore(format!(
                "query returned {status}: {body}"
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RagError::VectorStore(format!("invalid query response: {e}")))?;

        // Matches arrive ranked by descending similarity; entries without
        // metadata (written by other clients) are skipped.
        Ok(parsed
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata.map(|metadata| ScoredChunk {
                    metadata,
                    score: m.score,
                })
            })
            .collect())
    }
}
