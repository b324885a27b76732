//! Metadata Codec Module
//!
//! JSON encoding of metadata records, with I/O failures kept distinct from
//! parse failures.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

// == Encode ==
/// Serializes a record. Field order follows the type's declaration order, so
/// identical records always produce identical bytes.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| CacheError::InvalidInput(format!("record is not serializable: {}", e)))
}

fn parse<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| CacheError::Parse {
        path: path.display().to_string(),
        source,
    })
}

// == Decode ==
/// Reads and parses a record.
///
/// Fails with `NotFound` for a missing file, `Io` for other read failures,
/// and `Parse` for malformed content.
pub async fn decode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CacheError::from_io(e, path))?;
    parse(&bytes, path)
}

/// Blocking twin of [`decode`].
pub fn decode_sync<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| CacheError::from_io(e, path))?;
    parse(&bytes, path)
}

// == Tolerant Decode ==
/// Decodes a record, returning `default` unchanged on any failure.
pub async fn decode_or<T: DeserializeOwned>(path: &Path, default: T) -> T {
    decode(path).await.unwrap_or(default)
}

/// Blocking twin of [`decode_or`].
pub fn decode_or_sync<T: DeserializeOwned>(path: &Path, default: T) -> T {
    decode_sync(path).unwrap_or(default)
}
