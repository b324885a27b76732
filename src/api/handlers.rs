//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CacheEntry, CachedRead, EntryStore, OpTimings};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, ExistsResponse, HealthResponse, StatsResponse, WriteRequest,
};

/// Header carrying the payload encoding on reads
pub const ENCODING_HEADER: &str = "x-cache-encoding";
/// Header carrying the expiry timestamp (Unix milliseconds) on reads
pub const EXPIRES_HEADER: &str = "x-cache-expires";
/// Header carrying the milliseconds left before the entry expires
pub const TTL_REMAINING_HEADER: &str = "x-cache-ttl-remaining";

/// Application state shared across all handlers.
///
/// The store is cheap to clone and needs no lock: the filesystem is the only
/// shared state.
#[derive(Clone)]
pub struct AppState {
    pub store: EntryStore,
    /// Timings recorded by the store
    pub timings: Arc<OpTimings>,
    /// TTL applied to write requests that omit one
    pub default_ttl_ms: u64,
}

impl AppState {
    /// Creates a new AppState, attaching a fresh timings context to the store.
    pub fn new(store: EntryStore, default_ttl_ms: u64) -> Self {
        let timings = Arc::new(OpTimings::new());
        Self {
            store: store.with_timings(timings.clone()),
            timings,
            default_ttl_ms,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens (and creates if needed) the configured cache directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = EntryStore::open(&config.cache_dir).await?;
        Ok(Self::new(store, config.default_ttl_ms))
    }
}

/// Handler for PUT /entries/:name
///
/// Writes an entry, buffered or streaming depending on the request.
pub async fn write_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<CacheEntry>> {
    let (payload, options, streaming) = req.into_parts(state.default_ttl_ms);

    let record = if streaming {
        state.store.write_streaming(&name, payload, options).await?
    } else {
        state.store.write(&name, payload, options).await?
    };

    Ok(Json(record))
}

/// Handler for GET /entries/:name
///
/// Streams the payload of a valid entry.
pub async fn read_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let CachedRead { record, stream } = state.store.read(&name).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            HeaderName::from_static(ENCODING_HEADER),
            record.file.encoding.to_string(),
        ),
        (
            HeaderName::from_static(EXPIRES_HEADER),
            record.expires.unwrap_or_default().to_string(),
        ),
        (
            HeaderName::from_static(TTL_REMAINING_HEADER),
            record
                .ttl_remaining_ms(state.store.now_ms())
                .unwrap_or_default()
                .to_string(),
        ),
    ];

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Handler for GET /entries/:name/meta
///
/// Returns the metadata record without checking expiry.
pub async fn meta_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CacheEntry>> {
    let store = state.store.clone();
    let lookup = name.clone();
    let record = tokio::task::spawn_blocking(move || store.read_sync(&lookup))
        .await
        .map_err(|e| CacheError::Io {
            path: name.clone(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })?;

    record.map(Json).ok_or(CacheError::NotFound(name))
}

/// Handler for GET /entries/:name/exists
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ExistsResponse> {
    let exists = state.store.exists(&name).await;
    Json(ExistsResponse::new(name, exists))
}

/// Handler for POST /entries/:name/reset
///
/// Restarts the entry's ttl.
pub async fn reset_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CacheEntry>> {
    let record = state.store.reset(&name).await?;
    Ok(Json(record))
}

/// Handler for DELETE /entries/:name
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store.delete(&name).await?;
    Ok(Json(DeleteResponse::new(name)))
}

/// Handler for DELETE /entries
///
/// Removes every file in the cache directory.
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let summary = state.store.clear().await?;
    Ok(Json(ClearResponse::new(summary.removed)))
}

/// Handler for GET /stats
///
/// Returns per-operation timings.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.timings.snapshot()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
