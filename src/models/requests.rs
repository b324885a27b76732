//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Payload, WriteOptions};

/// Request body for writing an entry (PUT /entries/:name)
///
/// # Fields
/// - `data`: The payload; strings are text, other JSON values are structured
/// - `encoding`: Optional payload file encoding
/// - `subname`: Optional payload file sub-name
/// - `ttl_ms`: Optional TTL in milliseconds (uses default if not specified)
/// - `related_data`: Optional caller data stored with the record
/// - `override`: Replace an existing entry (default true)
/// - `streaming`: Use the concurrent streaming write (default false)
#[derive(Debug, Clone, Deserialize)]
pub struct WriteRequest {
    /// The payload to cache
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub subname: Option<String>,
    #[serde(default)]
    pub ttl_ms: Option<i64>,
    #[serde(default)]
    pub related_data: Option<Value>,
    #[serde(default, rename = "override")]
    pub override_existing: Option<bool>,
    #[serde(default)]
    pub streaming: bool,
}

impl WriteRequest {
    /// Splits the request into the payload and store write options.
    ///
    /// `default_ttl_ms` applies when the request carries no ttl.
    pub fn into_parts(self, default_ttl_ms: u64) -> (Payload, WriteOptions, bool) {
        let defaults = WriteOptions::default();
        let options = WriteOptions {
            encoding: self.encoding,
            subname: self.subname,
            ttl_ms: Some(self.ttl_ms.unwrap_or(default_ttl_ms as i64)),
            related_data: self.related_data.unwrap_or(defaults.related_data),
            override_existing: self.override_existing.unwrap_or(defaults.override_existing),
        };
        (Payload::from(self.data), options, self.streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_request_deserialize() {
        let json = r#"{"data": "hello"}"#;
        let req: WriteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.data, json!("hello"));
        assert!(req.ttl_ms.is_none());
        assert!(!req.streaming);
    }

    #[test]
    fn test_write_request_with_options() {
        let json = r#"{"data": {"a": 1}, "ttl_ms": 5000, "override": false, "encoding": "hex"}"#;
        let req: WriteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl_ms, Some(5000));
        assert_eq!(req.override_existing, Some(false));
        assert_eq!(req.encoding.as_deref(), Some("hex"));
    }

    #[test]
    fn test_into_parts_applies_defaults() {
        let req: WriteRequest = serde_json::from_str(r#"{"data": "hi"}"#).unwrap();
        let (payload, options, streaming) = req.into_parts(60_000);

        assert_eq!(payload, Payload::from("hi"));
        assert_eq!(options.ttl_ms, Some(60_000));
        assert!(options.override_existing);
        assert_eq!(options.related_data, json!({}));
        assert!(!streaming);
    }

    #[test]
    fn test_into_parts_structured_payload() {
        let req: WriteRequest =
            serde_json::from_str(r#"{"data": [1, 2], "streaming": true}"#).unwrap();
        let (payload, _options, streaming) = req.into_parts(60_000);

        assert_eq!(payload, Payload::Json(json!([1, 2])));
        assert!(streaming);
    }
}
