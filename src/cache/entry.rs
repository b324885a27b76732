//! Cache Entry Module
//!
//! Defines the metadata record persisted for every entry, the payload it
//! describes, and the encodings a payload can be written with.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::expiry;
use crate::error::{CacheError, Result};

// == Encoding ==
/// Byte/text encodings a payload file can be written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
    Binary,
    Latin1,
    Utf16le,
    Ucs2,
    Base64,
    Hex,
}

impl Encoding {
    /// Every recognized encoding; the first is the default for text payloads.
    pub const ALL: [Encoding; 8] = [
        Encoding::Utf8,
        Encoding::Ascii,
        Encoding::Binary,
        Encoding::Latin1,
        Encoding::Utf16le,
        Encoding::Ucs2,
        Encoding::Base64,
        Encoding::Hex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Binary => "binary",
            Encoding::Latin1 => "latin1",
            Encoding::Utf16le => "utf16le",
            Encoding::Ucs2 => "ucs2",
            Encoding::Base64 => "base64",
            Encoding::Hex => "hex",
        }
    }

    // == Encode Text ==
    /// Converts text into the bytes written to the payload file.
    ///
    /// For `base64` and `hex` the text is the encoded form and is decoded
    /// into raw bytes; invalid text is rejected as invalid input.
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii | Encoding::Latin1 | Encoding::Binary => {
                Ok(text.chars().map(|c| (c as u32 & 0xFF) as u8).collect())
            }
            Encoding::Utf16le | Encoding::Ucs2 => {
                Ok(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect())
            }
            Encoding::Base64 => STANDARD
                .decode(text.trim())
                .map_err(|e| CacheError::InvalidInput(format!("payload is not base64: {}", e))),
            Encoding::Hex => hex::decode(text.trim())
                .map_err(|e| CacheError::InvalidInput(format!("payload is not hex: {}", e))),
        }
    }

    // == Decode Bytes ==
    /// Renders payload file bytes back into text.
    pub fn decode_bytes(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Ascii => bytes.iter().map(|b| (b & 0x7F) as char).collect(),
            Encoding::Latin1 | Encoding::Binary => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Utf16le | Encoding::Ucs2 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Hex => hex::encode(bytes),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "binary" => Ok(Encoding::Binary),
            "latin1" => Ok(Encoding::Latin1),
            "utf16le" | "utf-16le" => Ok(Encoding::Utf16le),
            "ucs2" | "ucs-2" => Ok(Encoding::Ucs2),
            "base64" => Ok(Encoding::Base64),
            "hex" => Ok(Encoding::Hex),
            other => Err(CacheError::InvalidInput(format!(
                "unrecognized encoding '{}'",
                other
            ))),
        }
    }
}

// == Payload ==
/// The value a caller caches: text, raw bytes, or structured JSON.
///
/// In a record, bytes are stored as `{"type": "Buffer", "data": [..]}` so a
/// JSON array of small integers still decodes as [`Payload::Json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    #[serde(with = "tagged_bytes")]
    Binary(Vec<u8>),
    Json(Value),
}

/// Record representation of byte payloads.
mod tagged_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    enum Tag {
        Buffer,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged<B> {
        #[serde(rename = "type")]
        tag: Tag,
        data: B,
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        Tagged {
            tag: Tag::Buffer,
            data: bytes,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Tagged::<Vec<u8>>::deserialize(deserializer).map(|tagged| tagged.data)
    }
}

impl Payload {
    /// True for payloads that carry no data: empty text or bytes, `null`,
    /// and empty objects or arrays.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.is_empty(),
            Payload::Binary(bytes) => bytes.is_empty(),
            Payload::Json(Value::Null) => true,
            Payload::Json(Value::String(s)) => s.is_empty(),
            Payload::Json(Value::Object(map)) => map.is_empty(),
            Payload::Json(Value::Array(items)) => items.is_empty(),
            Payload::Json(_) => false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CacheError::InvalidInput("no data to cache".to_string()));
        }
        Ok(())
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }

    /// Serializes the payload into the bytes of its payload file.
    ///
    /// Byte payloads are written verbatim regardless of encoding.
    pub fn to_file_bytes(&self, encoding: Encoding) -> Result<Vec<u8>> {
        match self {
            Payload::Binary(bytes) => Ok(bytes.clone()),
            Payload::Text(text) => encoding.encode_text(text),
            Payload::Json(value) => {
                let text = serde_json::to_string(value).map_err(|e| {
                    CacheError::InvalidInput(format!("payload is not serializable: {}", e))
                })?;
                encoding.encode_text(&text)
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Binary(bytes.to_vec())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            other => Payload::Json(other),
        }
    }
}

// == File Info ==
/// Location and save status of an entry's payload file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Absolute path of the payload file
    pub path: PathBuf,
    /// True only once the payload write completed
    pub saved: bool,
    pub encoding: Encoding,
}

// == Cache Entry ==
/// Metadata record persisted next to each payload file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub name: String,
    #[serde(default)]
    pub data: Option<Payload>,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default = "empty_object")]
    pub related_data: Value,
    /// Write timestamp (Unix milliseconds)
    #[serde(default)]
    pub last_modified: Option<u64>,
    /// Expiration timestamp (Unix milliseconds)
    #[serde(default)]
    pub expires: Option<u64>,
    pub file: FileInfo,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl CacheEntry {
    // == Is Valid ==
    /// Checks whether the entry is still within its ttl at `now`.
    pub fn is_valid_at(&self, now: u64) -> bool {
        expiry::is_valid(self.last_modified, self.expires, now)
    }

    /// True when the record carries a non-empty payload.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_empty())
    }

    // == Time To Live ==
    /// Returns the ttl the entry was written with, `expires - lastModified`.
    pub fn ttl_ms(&self) -> Option<u64> {
        match (self.last_modified, self.expires) {
            (Some(last), Some(expires)) => Some(expires.saturating_sub(last)),
            _ => None,
        }
    }

    /// Returns remaining ttl in milliseconds at `now`, `Some(0)` once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.expires.map(|expires| expires.saturating_sub(now))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry(last_modified: u64, expires: u64) -> CacheEntry {
        CacheEntry {
            name: "x".to_string(),
            data: Some(Payload::from("hello")),
            encoding: Encoding::Utf8,
            related_data: empty_object(),
            last_modified: Some(last_modified),
            expires: Some(expires),
            file: FileInfo {
                path: PathBuf::from("/cache/x.conf_x"),
                saved: true,
                encoding: Encoding::Utf8,
            },
        }
    }

    #[test]
    fn test_encoding_parse_case_insensitive() {
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("Base64".parse::<Encoding>().unwrap(), Encoding::Base64);
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_encoding_default_is_first() {
        assert_eq!(Encoding::default(), Encoding::ALL[0]);
    }

    #[test]
    fn test_encode_text_per_encoding() {
        assert_eq!(Encoding::Utf8.encode_text("é").unwrap(), vec![0xC3, 0xA9]);
        assert_eq!(Encoding::Latin1.encode_text("é").unwrap(), vec![0xE9]);
        assert_eq!(Encoding::Utf16le.encode_text("A").unwrap(), vec![0x41, 0x00]);
        assert_eq!(Encoding::Hex.encode_text("cafe").unwrap(), vec![0xCA, 0xFE]);
        assert_eq!(Encoding::Base64.encode_text("aGk=").unwrap(), b"hi".to_vec());
    }

    #[test]
    fn test_encode_text_rejects_bad_hex() {
        let result = Encoding::Hex.encode_text("zz");
        assert!(matches!(result, Err(CacheError::InvalidInput(_))));
    }

    #[test]
    fn test_decode_bytes_restores_text() {
        for encoding in Encoding::ALL {
            if matches!(encoding, Encoding::Base64 | Encoding::Hex) {
                continue;
            }
            let bytes = encoding.encode_text("abc").unwrap();
            assert_eq!(encoding.decode_bytes(&bytes), "abc", "encoding {}", encoding);
        }
        assert_eq!(Encoding::Hex.decode_bytes(&[0xCA, 0xFE]), "cafe");
        assert_eq!(Encoding::Base64.decode_bytes(b"hi"), "aGk=");
    }

    #[test]
    fn test_payload_emptiness() {
        assert!(Payload::from("").is_empty());
        assert!(Payload::from(Vec::new()).is_empty());
        assert!(Payload::Json(Value::Null).is_empty());
        assert!(Payload::Json(json!({})).is_empty());
        assert!(Payload::Json(json!([])).is_empty());
        assert!(!Payload::Json(json!(0)).is_empty());
        assert!(!Payload::from("a").is_empty());
    }

    #[test]
    fn test_binary_payload_ignores_encoding() {
        let payload = Payload::from(vec![1u8, 2, 3]);
        assert_eq!(payload.to_file_bytes(Encoding::Hex).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_json_payload_written_as_text() {
        let payload = Payload::from(json!({"a": 1}));
        assert_eq!(payload.to_file_bytes(Encoding::Utf8).unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_entry_validity_boundary() {
        let entry = sample_entry(1_000, 2_000);
        assert!(entry.is_valid_at(1_500));
        assert!(entry.is_valid_at(2_000));
        assert!(!entry.is_valid_at(2_001));
    }

    #[test]
    fn test_entry_ttl() {
        let entry = sample_entry(1_000, 4_000);
        assert_eq!(entry.ttl_ms(), Some(3_000));
        assert_eq!(entry.ttl_remaining_ms(3_500), Some(500));
        assert_eq!(entry.ttl_remaining_ms(9_000), Some(0));
    }

    #[test]
    fn test_entry_json_field_names() {
        let json = serde_json::to_value(sample_entry(1, 2)).unwrap();
        assert_eq!(json["relatedData"], json!({}));
        assert_eq!(json["lastModified"], json!(1));
        assert_eq!(json["file"]["encoding"], json!("utf8"));
        assert_eq!(json["data"], json!("hello"));
    }

    #[test]
    fn test_payload_variants_survive_record_json() {
        for payload in [
            Payload::from("text"),
            Payload::from(vec![1u8, 2]),
            Payload::from(json!([1, 2])),
            Payload::from(json!({"type": "other", "data": [1]})),
        ] {
            let json = serde_json::to_string(&payload).unwrap();
            let decoded: Payload = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn test_binary_payload_is_tagged_in_record() {
        let json = serde_json::to_value(Payload::from(vec![0xCAu8, 0xFE])).unwrap();
        assert_eq!(json, json!({"type": "Buffer", "data": [202, 254]}));
    }

    #[test]
    fn test_entry_decode_without_timestamps() {
        let raw = r#"{"name":"x","data":"hi","file":{"path":"/p","saved":false,"encoding":"hex"}}"#;
        let entry: CacheEntry = serde_json::from_str(raw).unwrap();
        assert!(entry.last_modified.is_none());
        assert!(entry.ttl_ms().is_none());
        assert!(!entry.is_valid_at(0));
        assert_eq!(entry.related_data, json!({}));
    }
}
