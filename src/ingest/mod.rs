
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, StorageConfig};
use crate::embeddings::chunking::{ChunkingConfig, chunk_text};
use crate::embeddings::openai::EmbeddingProvider;
use crate::extract::extract_pdf_text;
use crate::vector_store::{ChunkMetadata, VectorEntry, VectorIndex};
use crate::{RagError, Result};

/// Outcome of a successful ingestion, returned to the uploader.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    pub num_chunks: usize,
    pub message: String,
}

/// Turns an uploaded PDF into vector index entries: save to disk, extract
/// text page by page, chunk, embed, and upsert as one batch.
pub struct IngestPipeline {
    upload_dir: PathBuf,
    retain_uploads: bool,
    chunking: ChunkingConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IngestPipeline {
    #[inline]
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let StorageConfig {
            upload_dir,
            retain_uploads,
        } = config.storage.clone();
        Self {
            upload_dir,
            retain_uploads,
            chunking: config.chunking.clone(),
            embedder,
            index,
        }
    }

    /// Ingest one uploaded file. The upload is written to the configured
    /// directory first so extraction failures leave the input on disk for
    /// inspection; on success the file is removed unless uploads are
    /// retained. Re-uploading the same filename overwrites the stored copy
    /// and adds new entries under a fresh document id.
    pub async fn ingest(&self, file_bytes: &[u8], file_name: &str) -> Result<IngestReport> {
        let file_name = sanitize_file_name(file_name)?;
        info!("Ingesting '{}' ({} bytes)", file_name, file_bytes.len());

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let saved_path = self.upload_dir.join(&file_name);
        tokio::fs::write(&saved_path, file_bytes).await?;

        let result = self.process_saved(&saved_path, &file_name).await;

        if result.is_ok() && !self.retain_uploads {
            if let Err(e) = tokio::fs::remove_file(&saved_path).await {
                warn!("Failed to remove upload {}: {}", saved_path.display(), e);
            }
        }

        result
    }

    async fn process_saved(&self, saved_path: &Path, file_name: &str) -> Result<IngestReport> {
        let path = saved_path.to_path_buf();
        let text = task::spawn_blocking(move || extract_pdf_text(&path))
            .await
            .map_err(|e| RagError::Extraction(format!("extraction task failed: {e}")))??;

        let chunks = chunk_text(&text, &self.chunking);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument);
        }
        debug!("Split '{}' into {} chunks", file_name, chunks.len());

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&contents).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let created_at = Utc::now().to_rfc3339();
        let entries = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| {
                let chunk_id = u32::try_from(chunk.chunk_index).map_err(|_| {
                    RagError::Validation(format!("too many chunks: {}", chunk.chunk_index))
                })?;
                Ok(VectorEntry {
                    id: Uuid::new_v4().to_string(),
                    values,
                    metadata: ChunkMetadata {
                        text: chunk.content.clone(),
                        doc_id: file_name.to_string(),
                        chunk_id,
                        created_at: created_at.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Entries for one document go in a single batch so a store failure
        // never leaves a document half-indexed.
        let stored = self.index.upsert(entries).await?;
        info!("Indexed '{}' as {} entries", file_name, stored);

        Ok(IngestReport {
            file_name: file_name.to_string(),
            num_chunks: chunks.len(),
            message: "File processed successfully".to_string(),
        })
    }
}

/// Reduce an uploaded filename to its final component, rejecting names
/// that are empty or resolve outside the upload directory.
fn sanitize_file_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RagError::Validation("filename cannot be empty".to_string()));
    }

    let name = Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RagError::Validation(format!("invalid filename: {raw}")))?;

    if name != trimmed {
        return Err(RagError::Validation(format!(
            "filename must not contain path components: {raw}"
        )));
    }

    Ok(name.to_string())
}
