use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Json, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::address::Address;
use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::{RugpullError, Result};
use crate::interfaces::providers::{AdvisoryGateway, TokenRiskGateway};
use crate::prompts::AGENT_NAME;
use crate::providers::{ChatCompletionsGateway, SolSnifferGateway};
use crate::services::analysis::{AnalysisService, INTERNAL_ERROR_TEXT};
use crate::services::events::{AgentEvent, EventSink};

const EVENT_BUFFER: usize = 32;
const SERVICE_NAME: &str = "Rug Pull Checker";
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("RUGPULL_GIT_SHA"));

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    /// Empty means any origin.
    pub allow_origins: Vec<String>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service: Arc::new(service),
            allow_origins: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let scanner: Arc<dyn TokenRiskGateway> = Arc::new(SolSnifferGateway::new(&config.scanner)?);
        let advisor: Arc<dyn AdvisoryGateway> =
            Arc::new(ChatCompletionsGateway::new(config.llm.clone())?);
        let cache = if config.scanner.enable_cache {
            let dir = config.cache_dir();
            tracing::info!(
                dir = %dir,
                ttl_hours = config.scanner.cache_ttl_hours,
                "Cache enabled"
            );
            Some(ExpiringCache::new(dir, config.scanner.cache_ttl_hours)?)
        } else {
            tracing::info!("Cache disabled");
            None
        };
        if config.scanner.max_retries > 0 {
            tracing::warn!(
                max_retries = config.scanner.max_retries,
                "Retries are not performed; each upstream call is attempted once"
            );
        }

        Ok(Self {
            service: Arc::new(AnalysisService::new(scanner, advisor, cache)),
            allow_origins: config.server.allow_origins.clone(),
        })
    }
}

#[derive(Deserialize)]
struct AssistRequest {
    query: AssistQuery,
}

#[derive(Deserialize)]
struct AssistQuery {
    #[serde(default)]
    id: Option<String>,
    prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent: String,
    pub service: String,
    pub version: String,
    pub cache_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCacheResponse {
    pub deleted: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.allow_origins);
    Router::new()
        .route("/assist", post(assist))
        .route("/health", get(health))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/{address}", delete(delete_cache_entry))
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(allow_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .max_age(Duration::from_secs(3600));

    if allow_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", allow_origins);
        let origins: Vec<HeaderValue> = allow_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent: AGENT_NAME.to_string(),
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        cache_enabled: state.service.cache().is_some(),
    })
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn assist(
    State(state): State<AppState>,
    Json(payload): Json<AssistRequest>,
) -> impl IntoResponse {
    let AssistQuery { id, prompt } = payload.query;
    let request_id = id.unwrap_or_default();
    tracing::info!(request_id = %request_id, "Assist request received");

    let (sink, mut rx) = EventSink::channel(EVENT_BUFFER);
    let service = state.service.clone();
    let task = tokio::spawn(async move {
        service.handle(&prompt, &sink).await;
    });
    let guard = AbortOnDrop(task.abort_handle());

    let body = Body::from_stream(async_stream::stream! {
        let _guard = guard;
        let mut finished = false;
        while let Some(event) = rx.recv().await {
            let done = event.is_done();
            yield Ok::<Bytes, Infallible>(Bytes::from(event.to_sse()));
            if done {
                finished = true;
                break;
            }
        }
        if !finished {
            tracing::error!(request_id = %request_id, "Request ended without a completion event");
            yield Ok(Bytes::from(AgentEvent::error(None, INTERNAL_ERROR_TEXT).to_sse()));
            yield Ok(Bytes::from(AgentEvent::Done.to_sse()));
        }
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
}

async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let removed = match state.service.cache() {
        Some(cache) => cache.clear_all().await,
        None => 0,
    };
    Json(ClearCacheResponse { removed })
}

async fn delete_cache_entry(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    let Some(address) = Address::parse(address.trim()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("not a Solana address: {address}"),
            }),
        )
            .into_response();
    };
    let deleted = match state.service.cache() {
        Some(cache) => cache.delete(&AnalysisService::cache_key(&address)).await,
        None => false,
    };
    Json(DeleteCacheResponse { deleted }).into_response()
}

pub async fn run(config: Config) -> Result<()> {
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
    };
    run_with_shutdown(config, shutdown).await
}

pub async fn run_with_shutdown<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RugpullError::Runtime(e.to_string()))?;
    tracing::info!(
        addr = %addr,
        model = %config.llm.model,
        scanner = %config.scanner.base_url,
        version = VERSION,
        "Rug pull checker listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RugpullError::Runtime(e.to_string()))?;

    tracing::info!("Daemon stopped");
    Ok(())
}
