
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::RagError;
use crate::config::Config;
use crate::embeddings::openai::{EmbeddingProvider, OpenAiEmbedder};
use crate::ingest::IngestPipeline;
use crate::llm::OpenAiChatClient;
use crate::query::QueryPipeline;
use crate::vector_store::{PineconeStore, VectorIndex};

const DEFAULT_TOP_K: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestPipeline>,
    pub query: Arc<QueryPipeline>,
}

/// Error response rendered as `{"detail": "..."}` with an appropriate
/// status code. Input problems map to 400, everything else to 500.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<RagError> for ApiError {
    #[inline]
    fn from(err: RagError) -> Self {
        let status = match err {
            RagError::EmptyDocument | RagError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {err}");
        }
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[inline]
pub fn create_router(state: AppState, max_upload_mb: usize) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        let report = state.ingest.ingest(&bytes, &file_name).await?;
        return Ok(Json(report).into_response());
    }

    Err(ApiError::bad_request("Missing file upload field"))
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let answer = state.query.answer(&request.query, request.top_k).await?;
    Ok(Json(answer).into_response())
}

/// Wire up the providers from configuration and serve until shutdown.
#[inline]
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
    let llm = Arc::new(OpenAiChatClient::new(&config.llm)?);
    let store: Arc<dyn VectorIndex> =
        Arc::new(PineconeStore::connect(&config.pinecone, config.embedding.dimension).await?);

    let state = AppState {
        ingest: Arc::new(IngestPipeline::new(
            &config,
            Arc::clone(&embedder),
            Arc::clone(&store),
        )),
        query: Arc::new(QueryPipeline::new(embedder, store, llm)),
    };

    let router = create_router(state, config.server.max_upload_mb);
    let listener = TcpListener::bind(config.server.bind_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}
