//! DocSyncAI HTTP server.
//!
//! Exposes the comparison and question-answering pipeline as a small JSON
//! API for the browser front end. One [`Session`] is shared by all clients;
//! each `POST /process` replaces it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Identity probe |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/process` | Upload 1 or 2 files (multipart field `files`) |
//! | `POST` | `/chat` | Ask a question about the processed files |
//! | `GET`  | `/report` | Download `DocSyncAI_Report.txt` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Question is empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). Model failures are
//! never reported here; they degrade to sentinel text in the response.
//!
//! # CORS
//!
//! Origins come from `[server].allowed_origins`; an entry of `"*"` permits
//! any origin.

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::{Config, ServerConfig};
use crate::pipeline::{
    answer_question, build_report, process_uploads, ProcessError, ProcessOutcome, QueryError,
    Services, Upload,
};
use crate::report::REPORT_FILE_NAME;
use crate::retrieve::Selection;
use crate::session::{self, Session, SharedSession};

/// Multipart field carrying the uploaded files.
const FILES_FIELD: &str = "files";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
    session: SharedSession,
}

impl AppState {
    pub fn new(services: Arc<Services>, session: SharedSession) -> Self {
        Self { services, session }
    }
}

/// Build the application router with CORS and the upload limit.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.services.config.server);
    let body_limit = state.services.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/process", post(handle_process))
        .route("/chat", post(handle_chat))
        .route("/report", get(handle_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and block until it exits.
pub async fn run_server(config: Config) -> Result<()> {
    let bind_addr = config.server.bind.clone();
    let services = Services::from_config(config)?;
    tracing::info!(
        chat_model = services.model.model_name(),
        embedding_model = services.embedder.model_name(),
        index_root = %services.store.root().display(),
        "services ready"
    );
    if !services.config.embedding.is_enabled() {
        tracing::warn!("embedding provider disabled; /chat answers will use raw file text only");
    }

    let state = AppState::new(Arc::new(services), session::shared(Session::empty()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("DocSyncAI server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (`"bad_request"` or `"internal"`).
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Internal(e) => {
                tracing::error!(error = format!("{:#}", e), "processing failed");
                internal(format!("{:#}", e))
            }
            other => bad_request(other.to_string()),
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        bad_request(err.to_string())
    }
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct RootResponse {
    ok: bool,
    msg: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        msg: "DocSyncAI backend".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /process ============

/// Reads every file part of the `files` field, then runs the pipeline.
/// Parts without a file name are ignored.
async fn handle_process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessOutcome>, AppError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| internal(format!("Malformed upload: {}", e.body_text())))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| internal(format!("Malformed upload: {}", e.body_text())))?;
        uploads.push(Upload {
            name,
            bytes: bytes.to_vec(),
        });
    }

    let outcome = process_uploads(&state.services, &state.session, uploads).await?;
    Ok(Json(outcome))
}

// ============ POST /chat ============

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    selected_file: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Clone so the lock is not held across model calls.
    let session = state.session.read().await.clone();
    let selection = Selection::from_request(req.selected_file.as_deref());

    let answer = answer_question(&state.services, &session, &req.question, &selection).await?;
    Ok(Json(ChatResponse { answer }))
}

// ============ GET /report ============

async fn handle_report(State(state): State<AppState>) -> Result<Response, AppError> {
    let session = state.session.read().await.clone();
    let report = build_report(&state.services, &session).await?;

    let disposition = format!("attachment; filename=\"{}\"", REPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report,
    )
        .into_response())
}
