//! HTTP surface: routes, handlers and the listener.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ChatSqlError, Result};
use crate::llm::Translator;
use crate::query::QueryExecutor;
use crate::render;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Message returned when the request carries no usable question.
pub const MISSING_QUESTION: &str = "Pergunta não fornecida.";

/// Shared, read-only request state.
#[derive(Debug)]
pub struct AppState {
    pub translator: Translator,
    pub executor: QueryExecutor,
}

impl AppState {
    pub fn new(translator: Translator, executor: QueryExecutor) -> Self {
        Self {
            translator,
            executor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PerguntaRequest {
    #[serde(default)]
    pergunta: Option<String>,
}

/// Body of a successful `POST /pergunta`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PerguntaResponse {
    /// The SQL that was run, or the translation error.
    pub query: String,
    /// The result table, or the rejection/execution message.
    pub tabela_html: String,
}

/// Body of a 400 response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErroResponse {
    pub erro: String,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/pergunta", post(pergunta))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatSqlError::config(format!("Failed to bind {addr}: {e}")))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ChatSqlError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /pergunta: question in, SQL and HTML table out.
async fn pergunta(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let question = serde_json::from_slice::<PerguntaRequest>(&body)
        .ok()
        .and_then(|req| req.pergunta)
        .filter(|q| !q.trim().is_empty());

    let Some(question) = question else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErroResponse {
                erro: MISSING_QUESTION.to_string(),
            }),
        )
            .into_response();
    };

    info!("Question received: {}", question);

    let query = match state.translator.translate(&question).await {
        Ok(sql) => sql,
        Err(e) => e.to_string(),
    };

    let result = state.executor.execute(&query, &[]).await;
    let tabela_html = match result.rows() {
        Some(rows) => render::records_to_html(rows),
        None => result.to_string(),
    };

    Json(PerguntaResponse { query, tabela_html }).into_response()
}
