//! HTTP API server.
//!
//! Exposes the chat gateway via a JSON HTTP API, plus a PDF proxy endpoint
//! so browser-based viewers can render papers without hitting the origin
//! source (and its CORS policy) directly.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Run one conversation turn over a paper |
//! | `GET`  | `/pdf` | Proxy a paper's PDF with caching + CORS headers |
//! | `POST` | `/extract` | Condense an uploaded schema document (cached) |
//! | `GET`  | `/cache/stats` | Extraction cache entry count and size |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure returns a non-2xx status with a body that is structurally
//! distinct from any success shape:
//!
//! ```json
//! { "error": "invalid arxiv paper id: 123", "code": "invalid_id" }
//! ```
//!
//! Codes: `bad_request` (400), `invalid_id` (400), `upstream_error` (502),
//! `network_error` (502), `store_error` (502), `generation_error` (502),
//! `contract_violation` (500), `internal` (500). Validation codes are never
//! worth retrying; a deployment-level retry layer can key off the rest.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients and
//! PDF viewers can call the API cross-origin.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::blobstore::GeminiFileStore;
use crate::cache::{CacheStats, ExtractCache};
use crate::chat::ChatService;
use crate::config::Config;
use crate::error::ChatError;
use crate::generate::create_backend;
use crate::ingest::HttpFetcher;
use crate::models::{ChatRequest, ChatResponse};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<ChatService>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. Builds the production wiring: Gemini blob store
/// and backend, HTTP source fetcher, and the on-disk extraction cache.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let cache = Arc::new(ExtractCache::open(&config.cache.path).await?);
    let backend: Arc<dyn crate::generate::GenerationBackend> =
        Arc::from(create_backend(&config.generation)?);

    let api_key = std::env::var(&config.generation.api_key_env).unwrap_or_default();
    let store = Arc::new(GeminiFileStore::new(api_key, config.ingest.timeout_secs)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.ingest)?);

    let service = Arc::new(ChatService::new(
        config.clone(),
        cache,
        store,
        backend,
        fetcher,
    ));

    serve(config, service).await
}

/// Starts the server with a pre-built [`ChatService`] (used by tests and
/// custom binaries that substitute their own capabilities).
pub async fn serve(config: &Config, service: Arc<ChatService>) -> anyhow::Result<()> {
    let state = AppState { service };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/pdf", get(handle_pdf))
        .route("/extract", post(handle_extract))
        .route("/cache/stats", get(handle_cache_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    tracing::info!(addr = %bind_addr, "paper-harness listening");
    println!("Paper Harness listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body. Always distinguishable from success bodies: no success
/// shape has a top-level `error` field.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::InvalidRequest(_) | ChatError::InvalidPaperId { .. } => {
                StatusCode::BAD_REQUEST
            }
            ChatError::UpstreamData(_)
            | ChatError::Network(_)
            | ChatError::Store(_)
            | ChatError::Generation(_) => StatusCode::BAD_GATEWAY,
            ChatError::ContractViolation(_) | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        AppError {
            status,
            body: ErrorBody {
                error: err.to_string(),
                code: err.code(),
                details: None,
            },
        }
    }
}

// ============ POST /chat ============

/// Handler for `POST /chat`.
///
/// Runs one conversation turn. The request carries the full transcript;
/// the server reconstructs the session from it and holds nothing between
/// requests.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.service.handle_chat(&request).await?;
    Ok(Json(response))
}

// ============ GET /pdf ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PdfQuery {
    document_id: String,
    source_tag: String,
}

/// Handler for `GET /pdf`.
///
/// Validates the identifier, downloads the PDF from its source, validates
/// the format signature, and returns the bytes with caching headers. The
/// permissive CORS layer lets client-side viewers load the result.
async fn handle_pdf(
    State(state): State<AppState>,
    Query(query): Query<PdfQuery>,
) -> Result<Response, AppError> {
    let (paper, bytes) = state
        .service
        .proxy_pdf(&query.document_id, &query.source_tag)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("inline; filename=\"{}.pdf\"", paper.blob_name()))
            .unwrap_or_else(|_| HeaderValue::from_static("inline")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    Ok((StatusCode::OK, headers, bytes).into_response())
}

// ============ POST /extract ============

#[derive(Deserialize)]
struct ExtractRequest {
    label: String,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    label: String,
    guide_length: usize,
    cache: CacheStats,
}

/// Handler for `POST /extract`.
///
/// Condenses an uploaded YAML/JSON schema document into a reference guide.
/// Repeat uploads of identical content are served from the cache without a
/// generation call.
async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let outcome = state
        .service
        .condense_upload(&request.label, &request.content)
        .await?;

    Ok(Json(ExtractResponse {
        label: request.label,
        guide_length: outcome.guide_length,
        cache: outcome.stats,
    }))
}

// ============ GET /cache/stats ============

/// Handler for `GET /cache/stats`.
async fn handle_cache_stats(
    State(state): State<AppState>,
) -> Result<Json<CacheStats>, AppError> {
    let stats = state
        .service
        .cache()
        .stats()
        .await
        .map_err(|e| AppError::from(ChatError::Internal(e.to_string())))?;
    Ok(Json(stats))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
///
/// Used by load balancers and monitoring tools.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
