//! File Cache - A filesystem-backed cache of named, time-limited entries
//!
//! Each entry is a JSON metadata record plus a raw payload file, with explicit
//! expiry, buffered and streaming writes, and streaming reads.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{CacheEntry, EntryStore, Payload, WriteOptions};
pub use config::Config;
pub use error::{CacheError, ReadFailure};
