//! Write Options Module
//!
//! Validated entry names and the options accepted by write operations.

use std::fmt;

use serde_json::Value;

use crate::cache::entry::empty_object;
use crate::cache::{expiry, Encoding, Payload, CONF_SUFFIX, DEFAULT_TTL_MS};
use crate::error::{CacheError, Result};

// == Entry Name ==
/// A name that is safe to turn into file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryName(String);

impl EntryName {
    /// Validates a caller-supplied name.
    ///
    /// Rejects empty and whitespace-only names, names that would escape
    /// the cache directory, and names containing `.conf_`, which could make
    /// one entry's payload file another entry's metadata file.
    pub fn parse(name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(CacheError::InvalidInput(
                "name must be a non-empty string".to_string(),
            ));
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(CacheError::InvalidInput(format!(
                "name '{}' cannot be used as a file name",
                name
            )));
        }
        if name.contains(&format!("{}_", CONF_SUFFIX)) {
            return Err(CacheError::InvalidInput(format!(
                "name '{}' contains the reserved sequence '{}_'",
                name, CONF_SUFFIX
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the metadata record.
    pub fn conf_file_name(&self) -> String {
        format!("{}{}", self.0, CONF_SUFFIX)
    }

    /// File name of the payload.
    ///
    /// Falls back to the entry name when `subname` is missing, blank,
    /// contains a path separator, or collides with the metadata suffix.
    pub fn payload_file_name(&self, subname: Option<&str>) -> String {
        let sub = match subname {
            Some(sub)
                if !sub.trim().is_empty()
                    && !sub.contains(['/', '\\', '\0'])
                    && !sub.contains(CONF_SUFFIX) =>
            {
                sub
            }
            _ => self.0.as_str(),
        };
        format!("{}{}_{}", self.0, CONF_SUFFIX, sub)
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Write Options ==
/// Options for buffered and streaming writes.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Requested encoding; unrecognized or missing values are inferred
    pub encoding: Option<String>,
    /// Distinct payload file sub-name; defaults to the entry name
    pub subname: Option<String>,
    /// Requested ttl in milliseconds, clamped on use
    pub ttl_ms: Option<i64>,
    /// Caller data stored verbatim in the record
    pub related_data: Value,
    /// Replace an existing entry instead of failing
    pub override_existing: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            subname: None,
            ttl_ms: Some(DEFAULT_TTL_MS as i64),
            related_data: empty_object(),
            override_existing: true,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn subname(mut self, subname: impl Into<String>) -> Self {
        self.subname = Some(subname.into());
        self
    }

    pub fn ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn related_data(mut self, related_data: Value) -> Self {
        self.related_data = related_data;
        self
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    // == Resolve Encoding ==
    /// Picks the encoding for a payload: the requested one if recognized,
    /// otherwise `binary` for byte payloads and `utf8` for everything else.
    pub fn resolve_encoding(&self, payload: &Payload) -> Encoding {
        if let Some(encoding) = self.encoding.as_deref().and_then(|e| e.parse().ok()) {
            return encoding;
        }
        if payload.is_binary() {
            Encoding::Binary
        } else {
            Encoding::ALL[0]
        }
    }

    /// Effective ttl in milliseconds.
    pub fn effective_ttl_ms(&self) -> u64 {
        expiry::clamp_ttl(self.ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_rejects_blank() {
        assert!(matches!(EntryName::parse(""), Err(CacheError::InvalidInput(_))));
        assert!(matches!(EntryName::parse("   \t"), Err(CacheError::InvalidInput(_))));
    }

    #[test]
    fn test_name_rejects_path_escapes() {
        assert!(EntryName::parse("../etc").is_err());
        assert!(EntryName::parse("a/b").is_err());
        assert!(EntryName::parse("..").is_err());
        assert!(EntryName::parse("a\\b").is_err());
    }

    #[test]
    fn test_name_rejects_payload_separator() {
        assert!(matches!(
            EntryName::parse("y.conf.conf_y"),
            Err(CacheError::InvalidInput(_))
        ));
        assert!(EntryName::parse("a.conf_b").is_err());
        // A plain `.conf` ending stays legal; its files cannot collide
        let name = EntryName::parse("y.conf").unwrap();
        assert_eq!(name.payload_file_name(None), "y.conf.conf_y.conf");
    }

    #[test]
    fn test_file_names_are_distinct() {
        let name = EntryName::parse("user").unwrap();
        assert_eq!(name.conf_file_name(), "user.conf");
        assert_eq!(name.payload_file_name(None), "user.conf_user");
        assert_eq!(name.payload_file_name(Some("avatar")), "user.conf_avatar");
    }

    #[test]
    fn test_subname_fallbacks() {
        let name = EntryName::parse("user").unwrap();
        assert_eq!(name.payload_file_name(Some("  ")), "user.conf_user");
        assert_eq!(name.payload_file_name(Some(".conf")), "user.conf_user");
        assert_eq!(name.payload_file_name(Some("x/y")), "user.conf_user");
    }

    #[test]
    fn test_defaults() {
        let options = WriteOptions::default();
        assert_eq!(options.effective_ttl_ms(), DEFAULT_TTL_MS);
        assert!(options.override_existing);
        assert_eq!(options.related_data, json!({}));
        assert!(options.subname.is_none());
    }

    #[test]
    fn test_resolve_encoding() {
        let text = Payload::from("hi");
        let bytes = Payload::from(vec![1u8]);

        assert_eq!(WriteOptions::new().resolve_encoding(&text), Encoding::Utf8);
        assert_eq!(WriteOptions::new().resolve_encoding(&bytes), Encoding::Binary);
        assert_eq!(
            WriteOptions::new().encoding("HEX").resolve_encoding(&text),
            Encoding::Hex
        );
        assert_eq!(
            WriteOptions::new().encoding("klingon").resolve_encoding(&text),
            Encoding::Utf8
        );
        assert_eq!(
            WriteOptions::new().encoding("nope").resolve_encoding(&bytes),
            Encoding::Binary
        );
    }

    #[test]
    fn test_builder_clamps_ttl() {
        assert_eq!(WriteOptions::new().ttl_ms(5_000).effective_ttl_ms(), 5_000);
        assert_eq!(WriteOptions::new().ttl_ms(10).effective_ttl_ms(), DEFAULT_TTL_MS);
    }
}
