//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::TimingStats;
use crate::error::ErrorCode;

/// Response body for the exists check (GET /entries/:name/exists)
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub name: String,
    pub exists: bool,
}

impl ExistsResponse {
    pub fn new(name: impl Into<String>, exists: bool) -> Self {
        Self {
            name: name.into(),
            exists,
        }
    }
}

/// Response body for the DELETE operation (DELETE /entries/:name)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The entry that was deleted
    pub name: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("Entry '{}' deleted successfully", name),
            name,
        }
    }
}

/// Response body for clearing the cache (DELETE /entries)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Number of files removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Removed {} files", removed),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Timing stats per store operation
    pub operations: BTreeMap<String, TimingStats>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a timings snapshot
    pub fn new(snapshot: BTreeMap<&'static str, TimingStats>) -> Self {
        Self {
            operations: snapshot
                .into_iter()
                .map(|(label, stats)| (label.to_string(), stats))
                .collect(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    /// Stable error identifier
    pub code: ErrorCode,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}
