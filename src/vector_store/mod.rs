// Vector store module
// Entry/metadata types, the index trait, and the remote Pinecone client

pub mod pinecone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use pinecone::PineconeStore;

/// A vector entry as stored in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorEntry {
    /// Unique identifier, generated at ingestion time
    pub id: String,
    /// The embedding vector (fixed dimension matching the index)
    pub values: Vec<f32>,
    /// Metadata stored alongside the vector
    pub metadata: ChunkMetadata,
}

/// Metadata stored with each vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// The chunk text
    pub text: String,
    /// Identifier of the owning document (the uploaded filename)
    pub doc_id: String,
    /// Index of the chunk within the document
    pub chunk_id: u32,
    /// RFC3339 timestamp of when this entry was created
    pub created_at: String,
}

/// A similarity-search match
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Similarity index over vector entries.
///
/// Implemented by the remote Pinecone client; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store entries in a single batch call. Returns the stored count.
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<usize>;

    /// Return up to `top_k` nearest entries by cosine similarity, in
    /// descending score order.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}
