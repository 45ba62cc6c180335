//! HTTP surface: `POST /api/transcript` and `GET /health`.
//!
//! Handlers translate [`TranscriptError`] kinds into status codes with fixed
//! messages. Error details only go to the log.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::WrapErr;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::error::TranscriptError;
use crate::ratelimit::RateLimiter;
use crate::resolver::TranscriptResolver;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    resolver: TranscriptResolver,
    limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(resolver: TranscriptResolver, limiter: RateLimiter) -> Self {
        Self {
            resolver,
            limiter: Arc::new(limiter),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        match &err {
            TranscriptError::InvalidUrl(_) => {
                warn!("{err}");
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid YouTube URL")
            }
            TranscriptError::TranscriptsDisabled(_) => {
                warn!("{err}");
                ApiError::new(StatusCode::NOT_FOUND, "Subtitles are disabled for this video")
            }
            TranscriptError::TranscriptNotFound(_) => {
                warn!("{err}");
                ApiError::new(StatusCode::NOT_FOUND, "No transcript available for this video")
            }
            TranscriptError::UpstreamUnavailable(_) => {
                error!("{err}");
                ApiError::new(StatusCode::BAD_GATEWAY, "Transcript service is unavailable")
            }
            TranscriptError::Unexpected(_) => {
                error!("{err}");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the application router. Only `/api/*` routes are rate limited.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/transcript", post(transcript))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(cors)
        .with_state(state)
}

/// Any origin when `origins` is empty, otherwise exactly the listed ones
pub fn cors_layer(origins: &[String]) -> eyre::Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>().wrap_err_with(|| format!("invalid CORS origin: {o}")))
        .collect::<eyre::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: &Config, resolver: TranscriptResolver) -> eyre::Result<()> {
    let state = AppState::new(resolver, RateLimiter::new(config.rate_limit));
    let app = router(state, cors_layer(&config.cors_origins)?);

    let host: IpAddr = config
        .host
        .parse()
        .wrap_err_with(|| format!("invalid listen host: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running HTTP server")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn transcript(
    State(state): State<AppState>,
    payload: Result<Json<TranscriptRequest>, JsonRejection>,
) -> ApiResult<Json<TranscriptResponse>> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected transcript request body: {rejection}");
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "URL is required"));
        }
    };

    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "URL is required"))?;

    info!("Transcript requested for {url}");
    let transcript = state.resolver.get_video_transcript(&url).await?;

    Ok(Json(TranscriptResponse { transcript }))
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.limiter.check(client) {
        warn!("Rate limit exceeded for {client}");
        return ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
    }

    next.run(req).await
}
