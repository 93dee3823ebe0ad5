use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("No text found in the document")]
    EmptyDocument,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod config;
pub mod embeddings;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod query;
pub mod server;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod test_util;
