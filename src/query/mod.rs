
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::embeddings::openai::EmbeddingProvider;
use crate::llm::LlmProvider;
use crate::vector_store::VectorIndex;
use crate::{RagError, Result};

/// Returned verbatim when retrieval produces nothing to ground an answer
/// on; the LLM is not called in that case.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Answer to a question, along with the retrieved context that grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub query: String,
    pub response: String,
    pub retrieved_chunks: Vec<String>,
}

/// Answers questions against the indexed documents: embed the question,
/// retrieve the closest chunks, and prompt the LLM with them as context.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
        }
    }

    /// Run retrieval and completion for one question. `top_k` of zero
    /// short-circuits without touching the index or the LLM.
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<QueryAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::Validation("query cannot be empty".to_string()));
        }

        if top_k == 0 {
            debug!("top_k is zero, skipping retrieval");
            return Ok(QueryAnswer {
                query: query.to_string(),
                response: NO_RELEVANT_INFORMATION.to_string(),
                retrieved_chunks: Vec::new(),
            });
        }

        let query_vector = self.embedder.embed(query).await?;
        let matches = self.index.query(&query_vector, top_k).await?;
        info!("Retrieved {} chunks for query", matches.len());

        // Matches keep the index's similarity order, best first.
        let retrieved_chunks: Vec<String> =
            matches.into_iter().map(|m| m.metadata.text).collect();

        if retrieved_chunks.is_empty() {
            return Ok(QueryAnswer {
                query: query.to_string(),
                response: NO_RELEVANT_INFORMATION.to_string(),
                retrieved_chunks,
            });
        }

        let prompt = build_prompt(&retrieved_chunks, query);
        let response = self.llm.complete(&prompt).await?;

        Ok(QueryAnswer {
            query: query.to_string(),
            response,
            retrieved_chunks,
        })
    }
}

fn build_prompt(chunks: &[String], query: &str) -> String {
    let context = chunks.join("\n\n");
    format!(
        "Using the following document content, provide a concise and accurate \
         answer to the question. If the document contains relevant information, \
         summarize it clearly. If the document does not contain relevant \
         information, state that explicitly. Do not speculate beyond the \
         provided content.\n\n\
         Extracted Content:\n{context}\n\n\
         Question:\n{query}"
    )
}
