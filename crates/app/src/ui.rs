//! Browser chat UI. Serves a single page and forwards questions to the HTTP
//! service; the page itself keeps the conversation.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const CHAT_PAGE: &str = include_str!("../assets/chat.html");
const API_TIMEOUT: Duration = Duration::from_secs(60);

pub struct UiState {
    api_url: String,
    client: Client,
}

impl UiState {
    pub fn new(api_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(API_TIMEOUT).build()?,
        })
    }

    async fn forward(&self, request: &AskRequest) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/query", self.api_url))
            .json(&json!({
                "question": request.question,
                "chat_history": request.chat_history,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{status}: {}", api_error_message(&body));
        }

        let body: AnswerBody = response.json().await?;
        Ok(body.answer)
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<String>,
}

/// Reply to the page. `failed` marks answers that are error text, which the
/// page keeps out of the conversation history.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

#[derive(Debug, Deserialize)]
struct AnswerBody {
    answer: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The `error` field of an API error body, or the raw body when it has none.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub fn router(state: Arc<UiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ask", post(ask))
        .with_state(state)
}

async fn index(State(state): State<Arc<UiState>>) -> Html<String> {
    Html(CHAT_PAGE.replace("{{API_URL}}", &escape_html(&state.api_url)))
}

async fn ask(State(state): State<Arc<UiState>>, Json(request): Json<AskRequest>) -> Json<AskResponse> {
    let reply = match state.forward(&request).await {
        Ok(answer) => AskResponse {
            answer,
            failed: false,
        },
        Err(error) => {
            warn!(%error, "backend request failed");
            AskResponse {
                answer: format!("Request failed: {error}"),
                failed: true,
            }
        }
    };
    Json(reply)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub async fn serve(api_url: &str, host: &str, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(UiState::new(api_url)?);
    let app = router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, backend = %api_url, "ui listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    Ok(())
}
