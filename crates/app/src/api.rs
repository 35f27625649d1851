//! HTTP service: `GET /health` and `POST /query`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use localrag_core::{history_from_turns, Answerer, DefaultAssistant, RagError, Settings};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct ApiState {
    pub health: HealthResponse,
    pub assistant: Arc<dyn Answerer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub llm_provider: String,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub embedding_model: String,
}

impl HealthResponse {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            status: "ok".to_string(),
            llm_provider: settings.llm_provider.to_string(),
            qdrant_url: settings.qdrant_url.clone(),
            qdrant_collection: settings.qdrant_collection_name.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub struct ApiError(RagError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RagError::EmptyQuestion => StatusCode::BAD_REQUEST,
            RagError::Search(_) | RagError::Llm(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "query failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .with_state(state)
}

async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(state.health.clone())
}

async fn query(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let history = history_from_turns(req.chat_history.as_deref().unwrap_or_default());
    let source = req.source.as_deref().filter(|source| !source.trim().is_empty());

    let answer = state
        .assistant
        .answer(&req.question, &history, source)
        .await
        .map_err(ApiError)?;

    Ok(Json(QueryResponse { answer }))
}

/// Resolve every backend from `settings`, then serve until Ctrl-C.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let assistant = DefaultAssistant::from_settings(settings)?;
    let state = Arc::new(ApiState {
        health: HealthResponse::from_settings(settings),
        assistant: Arc::new(assistant),
    });

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    Ok(())
}
