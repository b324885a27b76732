//! Cache Module
//!
//! Filesystem-backed entries with explicit expiry and streaming reads.

mod barrier;
pub mod codec;
mod entry;
mod expiry;
mod options;
mod store;
mod stream;
mod timing;


// Re-export public types
pub use barrier::WriteBarrier;
pub use entry::{CacheEntry, Encoding, FileInfo, Payload};
pub use expiry::{clamp_ttl, current_timestamp_ms, is_valid, Clock, FixedClock, SystemClock};
pub use options::{EntryName, WriteOptions};
pub use store::{CachedRead, ClearSummary, EntryStore};
pub use stream::PayloadStream;
pub use timing::{OpTimings, TimingGuard, TimingStats};

// == Public Constants ==
/// Suffix of metadata file names; payload files append `_<subname>`
pub const CONF_SUFFIX: &str = ".conf";

/// Default time-to-live in milliseconds
pub const DEFAULT_TTL_MS: u64 = 60 * 60 * 1000; // 1 hour

/// Shortest accepted time-to-live in milliseconds
pub const MIN_TTL_MS: u64 = 1000;

/// Longest accepted time-to-live in milliseconds
pub const MAX_TTL_MS: u64 = 365 * 24 * 60 * 60 * 1000; // 365 days
