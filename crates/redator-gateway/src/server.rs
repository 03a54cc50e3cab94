//! HTTP server: article generation endpoint and health check

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use redator_core::{Article, Error, RedatorConfig, Rejection};
use redator_llm::{LlmProvider, OpenAiCompatProvider};
use redator_pipeline::{LlmStageFactory, PipelineOrchestrator};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared, immutable state behind every request.
pub struct AppState {
    pub config: Arc<RedatorConfig>,
    pub pipeline: PipelineOrchestrator<LlmStageFactory>,
}

impl AppState {
    pub fn new(config: Arc<RedatorConfig>, factory: LlmStageFactory) -> redator_core::Result<Self> {
        let pipeline = PipelineOrchestrator::from_config(factory, &config)?;
        Ok(Self { config, pipeline })
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub assunto: String,
}

/// Error body `{"detail": ...}` with its status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(r: Rejection) -> Self {
        Self::bad_request(r.to_string())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Rejected(r) => r.into(),
            Error::Upstream { .. } => Self::internal(format!("Falha na comunicação com o LLM: {}", e)),
            other => Self::internal(format!("Falha na geração do artigo. Erro interno: {}", other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/gerar-artigo", post(generate_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Build the production pipeline from config and serve until shutdown.
pub async fn start_server(config: RedatorConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let mut provider = OpenAiCompatProvider::new(config.llm.base_url.as_str())
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    match config.api_key() {
        Some(key) => provider = provider.with_api_key(key),
        None => warn!(
            "{} not set; calls to {} go out without credentials",
            config.llm.api_key_env, config.llm.base_url
        ),
    }

    let provider: Arc<dyn LlmProvider> = Arc::new(provider);
    let provider_name = provider.name().to_string();
    let factory = LlmStageFactory::wikipedia(config.clone(), provider);
    let state = Arc::new(AppState::new(config.clone(), factory)?);
    let app = router(state);

    let bind_addr: SocketAddr =
        format!("{}:{}", config.server.bind.to_addr(), config.server.port).parse()?;

    info!("Redator v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: http://{}", bind_addr);
    info!("  Model:        {} via {} ({})", config.llm.model, config.llm.base_url, provider_name);
    info!("  Knowledge:    {}", config.knowledge.api_url);
    info!("  Word count:   {:?}", config.contract.word_count_policy);
    if let Some(path) = &config.guard.audit_log {
        info!("  Audit log:    {}", path.display());
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.config.server.service_name,
    }))
}

/// Clients asking for `text/markdown` get the rendered article instead of JSON.
fn wants_markdown(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/markdown"))
}

fn render(article: Article, markdown: bool) -> Response {
    if markdown {
        (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            article.to_markdown(),
        )
            .into_response()
    } else {
        Json(article).into_response()
    }
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::bad_request(format!("Corpo da requisição inválido: {}", e.body_text())))?;

    let max = state.pipeline.guard().max_chars();
    let len = request.assunto.chars().count();
    if len > max {
        return Err(Rejection::TooLong { len, max }.into());
    }

    info!(chars = len, "article requested");

    let limit = Duration::from_secs(state.config.server.request_timeout_secs);
    match tokio::time::timeout(limit, state.pipeline.admit_and_run(&request.assunto)).await {
        Ok(Ok(article)) => Ok(render(article, wants_markdown(&headers))),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            error!(timeout_secs = limit.as_secs(), "article generation timed out");
            Err(Error::Internal(format!("tempo limite de {}s excedido", limit.as_secs())).into())
        }
    }
}
