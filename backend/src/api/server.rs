//! HTTP server for the table conversion API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                     |
//! |--------|-------------------|-------------------------------------------------|
//! | GET    | `/health`         | Health check                                    |
//! | POST   | `/api/upload`     | Upload a table, get its columns and a session   |
//! | GET    | `/api/session`    | Columns of the current session's upload         |
//! | POST   | `/api/convert`    | Melt the session's upload, streamed as CSV      |
//! | GET    | `/api/logs`       | SSE stream of the current session's logs        |
//!
//! The session key travels in the `tableconverter-session` cookie.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::stream::melt_to_body;
use super::types::{ConvertRequest, UploadResponse};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult, SessionError, UploadError};
use crate::reshape::Delimiter;
use crate::session::{
    new_session_key, spawn_sweeper, Clock, InMemorySessionStore, PendingUpload, SessionStore,
    SystemClock, SESSION_COOKIE,
};

/// Form field carrying the delimiter spec.
const SEPARATOR_FIELD: &str = "separator";

/// Extra room for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<dyn SessionStore<Value = PendingUpload>>,
    /// Time source shared with the session store.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// State backed by an in-memory session store on the system clock.
    pub fn new(config: ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sessions = Arc::new(InMemorySessionStore::with_clock(clock.clone()));
        Self::with_store(config, sessions, clock)
    }

    /// `clock` must be the clock `sessions` stamps its entries with.
    pub fn with_store(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore<Value = PendingUpload>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            clock,
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_table))
        .route("/api/session", get(current_session))
        .route("/api/convert", post(convert_table))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and the session sweeper.
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config.clone());
    let sweeper = spawn_sweeper(
        state.sessions.clone(),
        state.clock.clone(),
        config.sweep_interval,
    );

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        session_ttl_secs = config.session_ttl.as_secs(),
        upload_dir = %config.upload_dir.display(),
        "tableconverter server listening"
    );

    let served = axum::serve(listener, router(state)).await;
    sweeper.abort();
    served?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tableconverter",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "session": "GET /api/session",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint streaming the log entries of the caller's session.
async fn sse_logs(
    headers: HeaderMap,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let key = session_key(&headers).ok_or(SessionError::MissingCookie)?;

    let stream = LOG_BROADCASTER
        .subscribe_session(key)
        .filter_map(|entry| {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        });

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Upload endpoint: stage the table and open a session.
async fn upload_table(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Response> {
    let mut file_data = None;
    let mut file_name: Option<String> = None;
    let mut separator: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == state.config.upload_field {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Multipart(e.to_string()))?,
            );
        } else if name == SEPARATOR_FIELD {
            separator = Some(
                field
                    .text()
                    .await
                    .map_err(|e| UploadError::Multipart(e.to_string()))?,
            );
        }
    }

    let bytes = file_data.ok_or_else(|| UploadError::MissingFile(state.config.upload_field.clone()))?;
    if bytes.len() > state.config.max_upload_bytes {
        return Err(UploadError::TooLarge {
            size: bytes.len(),
            max: state.config.max_upload_bytes,
        }
        .into());
    }

    // An empty separator field means the form left the default.
    let delimiter = match separator.as_deref().filter(|s| !s.is_empty()) {
        Some(spec) => Delimiter::from_spec(spec)?,
        None => Delimiter::default(),
    };

    let key = new_session_key();
    log_info(
        &key,
        format!(
            "Upload received: {} ({} bytes, delimiter '{}')",
            file_name.as_deref().unwrap_or("unnamed"),
            bytes.len(),
            delimiter
        ),
    );

    let dir = state.config.upload_dir.clone();
    let created_at = state.clock.now();
    let upload = tokio::task::spawn_blocking(move || {
        PendingUpload::stage_at(&dir, &bytes, delimiter, file_name, created_at)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    if upload.encoding != "utf-8" {
        log_warning(&key, format!("Upload decoded from {}", upload.encoding));
    }

    let ttl = state.config.session_ttl;
    state.sessions.put(&key, upload.clone(), ttl)?;
    log_info(&key, format!("Session opened with {} columns", upload.labels.len()));

    let cookie = session_cookie(&key, ttl)?;
    let body = UploadResponse::new(key, &upload, ttl.as_secs());
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Columns of the upload behind the session cookie.
async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<UploadResponse>> {
    let key = session_key(&headers).ok_or(SessionError::MissingCookie)?;
    let upload = state.sessions.get(&key)?.ok_or(SessionError::NotFound)?;

    let elapsed = (state.clock.now() - upload.created_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    let remaining = state.config.session_ttl.saturating_sub(elapsed);
    Ok(Json(UploadResponse::new(key, &upload, remaining.as_secs())))
}

/// Convert endpoint: validate the fixed columns, then stream the melt.
///
/// Validation failures keep the session so the client can pick again.
/// Only the request that takes the session streams it.
async fn convert_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ConvertRequest>,
) -> ServerResult<Response> {
    let key = session_key(&headers).ok_or(SessionError::MissingCookie)?;
    let pending = state.sessions.get(&key)?.ok_or(SessionError::NotFound)?;
    let plan = pending.column_plan(request.fixed)?;
    drop(pending);

    let upload = state.sessions.take(&key)?.ok_or(SessionError::NotFound)?;

    log_info(
        &key,
        format!(
            "Converting with fixed columns [{}] ({} measurement columns)",
            plan.fixed().join(", "),
            plan.measurement_count()
        ),
    );

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/csv; charset=utf-8"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=converted.csv"),
        ),
        (header::SET_COOKIE, expired_cookie()?),
    ];
    Ok((headers, melt_to_body(upload, plan, key)).into_response())
}

fn session_cookie(key: &str, ttl: Duration) -> ServerResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={key}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        ttl.as_secs()
    ))
    .map_err(|e| ServerError::Internal(e.to_string()))
}

fn expired_cookie() -> ServerResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax"
    ))
    .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Session key from the request's `Cookie` headers.
pub fn session_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
