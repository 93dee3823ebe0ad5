// Embeddings module
// Text chunking and the embedding provider adapter

pub mod chunking;
pub mod openai;

pub use chunking::{ChunkingConfig, TextChunk, chunk_text};
pub use openai::{EmbeddingProvider, OpenAiEmbedder};
