//! Entry Store Module
//!
//! Lifecycle of named entries on disk: every entry is a metadata record
//! (`<name>.conf`) plus a payload file (`<name>.conf_<subname>`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::stream::CHUNK_SIZE;
use crate::cache::{
    codec, CacheEntry, Clock, EntryName, FileInfo, OpTimings, Payload, PayloadStream,
    SystemClock, TimingGuard, WriteBarrier, WriteOptions,
};
use crate::error::{CacheError, ReadFailure, Result};

// == Read Result ==
/// A valid entry together with an open stream over its payload.
#[derive(Debug)]
pub struct CachedRead {
    pub record: CacheEntry,
    pub stream: PayloadStream,
}

/// Outcome of clearing the cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    /// Number of files removed
    pub removed: usize,
}

// == Entry Store ==
/// Filesystem-backed store of named, time-limited entries.
///
/// Cloning is cheap; clones share the directory, clock and timings. No
/// in-process locking is done: exclusive file creation is the only guard
/// against concurrent writers.
#[derive(Debug, Clone)]
pub struct EntryStore {
    /// Absolute cache directory
    dir: Arc<PathBuf>,
    clock: Arc<dyn Clock>,
    timings: Option<Arc<OpTimings>>,
}

impl EntryStore {
    // == Constructor ==
    /// Opens a store over `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CacheError::from_io(e, dir))?;
        let dir = tokio::fs::canonicalize(dir)
            .await
            .map_err(|e| CacheError::from_io(e, dir))?;
        debug!("Entry store opened at {}", dir.display());

        Ok(Self {
            dir: Arc::new(dir),
            clock: Arc::new(SystemClock),
            timings: None,
        })
    }

    /// Replaces the clock used for timestamps and validity checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches an instrumentation context that records operation timings.
    pub fn with_timings(mut self, timings: Arc<OpTimings>) -> Self {
        self.timings = Some(timings);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn timings(&self) -> Option<&Arc<OpTimings>> {
        self.timings.as_ref()
    }

    /// Path of the metadata record for `name`.
    pub fn conf_path(&self, name: &EntryName) -> PathBuf {
        self.dir.join(name.conf_file_name())
    }

    fn time(&self, label: &'static str) -> Option<TimingGuard<'_>> {
        self.timings.as_deref().map(|timings| timings.start(label))
    }

    /// Current time according to the store's clock (Unix milliseconds).
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // == Prepare ==
    /// Validates the payload and builds the record plus payload file bytes.
    /// Nothing touches the filesystem here.
    fn prepare(
        &self,
        name: &EntryName,
        payload: Payload,
        options: &WriteOptions,
    ) -> Result<(CacheEntry, Vec<u8>)> {
        payload.validate()?;
        let encoding = options.resolve_encoding(&payload);
        let bytes = payload.to_file_bytes(encoding)?;
        let ttl = options.effective_ttl_ms();
        let now = self.now_ms();

        let record = CacheEntry {
            name: name.to_string(),
            data: Some(payload),
            encoding,
            related_data: options.related_data.clone(),
            last_modified: Some(now),
            expires: Some(now + ttl),
            file: FileInfo {
                path: self
                    .dir
                    .join(name.payload_file_name(options.subname.as_deref())),
                saved: false,
                encoding,
            },
        };
        Ok((record, bytes))
    }

    fn is_usable(&self, record: &CacheEntry) -> bool {
        record.is_valid_at(self.now_ms()) && record.has_data() && record.file.saved
    }

    // == Write ==
    /// Buffered write: payload file first, then the metadata record.
    ///
    /// The record is persisted even when the payload write fails; that case
    /// returns [`CacheError::PayloadNotSaved`] carrying the `saved: false`
    /// record. With override disabled an existing record fails the call with
    /// `AlreadyExists` and leaves the existing files untouched.
    pub async fn write(
        &self,
        name: &str,
        payload: impl Into<Payload>,
        options: WriteOptions,
    ) -> Result<CacheEntry> {
        let _timer = self.time("write");
        let name = EntryName::parse(name)?;
        let (mut record, bytes) = self.prepare(&name, payload.into(), &options)?;
        let overwrite = options.override_existing;

        let payload_result = write_file(&record.file.path, &bytes, overwrite).await;
        record.file.saved = payload_result.is_ok();
        if let Err(e) = &payload_result {
            warn!(
                "Payload write for '{}' failed at {}: {}",
                name,
                record.file.path.display(),
                e
            );
        }

        let conf_path = self.conf_path(&name);
        let encoded = codec::encode(&record)?;
        if let Err(e) = write_file(&conf_path, &encoded, overwrite).await {
            if e.kind() == io::ErrorKind::AlreadyExists {
                if record.file.saved {
                    // Payload was created by this call; drop it so the conflict leaves no trace
                    let _ = tokio::fs::remove_file(&record.file.path).await;
                }
                debug!("Write for '{}' rejected: entry exists", name);
                return Err(CacheError::AlreadyExists(name.to_string()));
            }
            return Err(CacheError::from_io(e, &conf_path));
        }

        if let Err(source) = payload_result {
            return Err(CacheError::PayloadNotSaved {
                record: Box::new(record),
                source,
            });
        }

        info!(
            "Wrote entry '{}' ({} bytes, ttl {}ms)",
            name,
            bytes.len(),
            options.effective_ttl_ms()
        );
        Ok(record)
    }

    // == Write Streaming ==
    /// Concurrent write: payload and record go through two independent sinks
    /// joined by a [`WriteBarrier`].
    ///
    /// `file.saved` is set before either sink starts; the call either
    /// resolves with the record once both sinks finish or fails with the
    /// first sink error. Once both sinks have finished, a failed call is
    /// repaired: without override every file this call created is removed;
    /// with override a committed record whose payload failed is rewritten
    /// with `saved: false`.
    pub async fn write_streaming(
        &self,
        name: &str,
        payload: impl Into<Payload>,
        options: WriteOptions,
    ) -> Result<CacheEntry> {
        let _timer = self.time("write_streaming");
        let name = EntryName::parse(name)?;
        let (mut record, bytes) = self.prepare(&name, payload.into(), &options)?;
        record.file.saved = true;
        let encoded = codec::encode(&record)?;
        let overwrite = options.override_existing;
        let conf_path = self.conf_path(&name);

        let payload_sink = Arc::new(SinkProgress::default());
        let conf_sink = Arc::new(SinkProgress::default());
        let mut barrier = WriteBarrier::new();
        barrier.spawn(stream_to_file(
            record.file.path.clone(),
            bytes,
            overwrite,
            name.to_string(),
            payload_sink.clone(),
        ));
        barrier.spawn(stream_to_file(
            conf_path.clone(),
            encoded,
            overwrite,
            name.to_string(),
            conf_sink.clone(),
        ));

        let error = match barrier.wait().await {
            Ok(()) => {
                info!("Streamed entry '{}' to disk", name);
                return Ok(record);
            }
            Err(e) => e,
        };
        warn!("Streaming write for '{}' failed: {}", name, error);

        if !overwrite {
            for (path, sink) in [(&record.file.path, &payload_sink), (&conf_path, &conf_sink)] {
                if sink.opened() {
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        warn!("Could not remove {}: {}", path.display(), e);
                    }
                }
            }
        } else if conf_sink.finished() && !payload_sink.finished() {
            record.file.saved = false;
            let marked = match codec::encode(&record) {
                Ok(encoded) => write_file(&conf_path, &encoded, true)
                    .await
                    .map_err(|e| CacheError::from_io(e, &conf_path)),
                Err(e) => Err(e),
            };
            if let Err(e) = marked {
                warn!("Could not mark '{}' unsaved: {}", name, e);
            }
        }
        Err(error)
    }

    // == Read ==
    /// Decodes the record, opens the payload stream, then checks expiry.
    ///
    /// An expired entry fails with `Expired` but keeps both the record and
    /// the open stream attached to the failure.
    pub async fn read(&self, name: &str) -> std::result::Result<CachedRead, ReadFailure> {
        let _timer = self.time("read");
        let name = EntryName::parse(name).map_err(ReadFailure::bare)?;

        let record: CacheEntry = match codec::decode(&self.conf_path(&name)).await {
            Ok(record) => record,
            Err(e) => {
                debug!("Read of '{}' found no usable record: {}", name, e);
                return Err(ReadFailure::bare(CacheError::NotFound(name.to_string())));
            }
        };

        let stream = match PayloadStream::open(&record.file.path, record.file.encoding).await {
            Ok(stream) => stream,
            Err(error) => {
                return Err(ReadFailure {
                    error,
                    record: Some(record),
                    stream: None,
                })
            }
        };

        if !record.is_valid_at(self.now_ms()) {
            return Err(ReadFailure {
                error: CacheError::Expired(name.to_string()),
                record: Some(record),
                stream: Some(stream),
            });
        }

        Ok(CachedRead { record, stream })
    }

    /// Decode-only read; `None` when the record is missing or malformed.
    /// Expiry is not checked.
    pub fn read_sync(&self, name: &str) -> Option<CacheEntry> {
        self.read_sync_or(name, None)
    }

    /// Like [`EntryStore::read_sync`], returning `default` on any failure.
    pub fn read_sync_or(&self, name: &str, default: Option<CacheEntry>) -> Option<CacheEntry> {
        match EntryName::parse(name) {
            Ok(name) => codec::decode_or_sync(&self.conf_path(&name), default),
            Err(_) => default,
        }
    }

    // == Exists ==
    /// True iff the record decodes, is not expired, has data, and its payload
    /// was saved.
    pub async fn exists(&self, name: &str) -> bool {
        let Ok(name) = EntryName::parse(name) else {
            return false;
        };
        match codec::decode::<CacheEntry>(&self.conf_path(&name)).await {
            Ok(record) => self.is_usable(&record),
            Err(_) => false,
        }
    }

    pub fn exists_sync(&self, name: &str) -> bool {
        self.read_sync(name)
            .is_some_and(|record| self.is_usable(&record))
    }

    // == Reset ==
    /// Restarts an entry's ttl from now, keeping its original duration.
    pub async fn reset(&self, name: &str) -> Result<CacheEntry> {
        let _timer = self.time("reset");
        let name = EntryName::parse(name)?;
        let conf_path = self.conf_path(&name);

        let mut record: CacheEntry = codec::decode(&conf_path).await?;
        refresh(&mut record, self.now_ms())?;
        let encoded = codec::encode(&record)?;
        tokio::fs::write(&conf_path, encoded)
            .await
            .map_err(|e| CacheError::from_io(e, &conf_path))?;

        info!("Reset entry '{}' (expires {:?})", name, record.expires);
        Ok(record)
    }

    pub fn reset_sync(&self, name: &str) -> bool {
        let reset = || -> Result<()> {
            let name = EntryName::parse(name)?;
            let conf_path = self.conf_path(&name);
            let mut record: CacheEntry = codec::decode_sync(&conf_path)?;
            refresh(&mut record, self.now_ms())?;
            fs::write(&conf_path, codec::encode(&record)?)
                .map_err(|e| CacheError::from_io(e, &conf_path))
        };
        match reset() {
            Ok(()) => true,
            Err(e) => {
                debug!("Sync reset of '{}' failed: {}", name, e);
                false
            }
        }
    }

    // == Delete ==
    /// Removes the payload file, then the metadata record.
    ///
    /// A payload that was never saved is allowed to be missing.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let _timer = self.time("delete");
        let name = EntryName::parse(name)?;
        let conf_path = self.conf_path(&name);

        let record: CacheEntry = codec::decode(&conf_path).await?;
        let payload_path = self.owned_payload_path(&record)?;
        if let Err(e) = tokio::fs::remove_file(payload_path).await {
            if record.file.saved || e.kind() != io::ErrorKind::NotFound {
                return Err(CacheError::from_io(e, payload_path));
            }
        }
        tokio::fs::remove_file(&conf_path)
            .await
            .map_err(|e| CacheError::from_io(e, &conf_path))?;

        info!("Deleted entry '{}'", name);
        Ok(())
    }

    pub fn delete_sync(&self, name: &str) -> bool {
        let delete = || -> Result<()> {
            let name = EntryName::parse(name)?;
            let conf_path = self.conf_path(&name);
            let record: CacheEntry = codec::decode_sync(&conf_path)?;
            let payload_path = self.owned_payload_path(&record)?;
            if let Err(e) = fs::remove_file(payload_path) {
                if record.file.saved || e.kind() != io::ErrorKind::NotFound {
                    return Err(CacheError::from_io(e, payload_path));
                }
            }
            fs::remove_file(&conf_path).map_err(|e| CacheError::from_io(e, &conf_path))
        };
        match delete() {
            Ok(()) => true,
            Err(e) => {
                debug!("Sync delete of '{}' failed: {}", name, e);
                false
            }
        }
    }

    /// Payload path from a record, refusing paths outside the cache directory.
    fn owned_payload_path<'a>(&self, record: &'a CacheEntry) -> Result<&'a Path> {
        let path = record.file.path.as_path();
        if path.parent() != Some(self.dir.as_path()) {
            return Err(CacheError::InvalidInput(format!(
                "payload path {} is outside the cache directory",
                path.display()
            )));
        }
        Ok(path)
    }

    // == Clear ==
    /// Removes every file in the cache directory, stopping at the first
    /// failure.
    pub async fn clear(&self) -> Result<ClearSummary> {
        let _timer = self.time("clear");
        let dir = self.dir.as_path();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CacheError::from_io(e, dir))?;

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::from_io(e, dir))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CacheError::from_io(e, &path))?;
            if !file_type.is_file() {
                continue;
            }
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| CacheError::from_io(e, &path))?;
            removed += 1;
        }

        info!("Cleared cache: removed {} files", removed);
        Ok(ClearSummary { removed })
    }

    pub fn clear_sync(&self) -> bool {
        let clear = || -> io::Result<usize> {
            let mut removed = 0;
            for entry in fs::read_dir(self.dir.as_path())? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
            Ok(removed)
        };
        match clear() {
            Ok(removed) => {
                info!("Cleared cache: removed {} files", removed);
                true
            }
            Err(e) => {
                warn!("Sync clear of {} failed: {}", self.dir.display(), e);
                false
            }
        }
    }
}

// == File Helpers ==
/// Restarts the ttl window at `now`, keeping `expires - lastModified`.
fn refresh(record: &mut CacheEntry, now: u64) -> Result<()> {
    let ttl = record
        .ttl_ms()
        .ok_or_else(|| CacheError::MissingTimestamps(record.name.clone()))?;
    let expires = now.checked_add(ttl).ok_or_else(|| {
        CacheError::InvalidInput(format!("ttl of '{}' overflows the clock", record.name))
    })?;
    record.last_modified = Some(now);
    record.expires = Some(expires);
    Ok(())
}

/// Opens a file for writing: truncating when overwriting is allowed,
/// exclusive creation otherwise.
async fn open_for_write(path: &Path, overwrite: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path).await
}

async fn write_file(path: &Path, bytes: &[u8], overwrite: bool) -> io::Result<()> {
    let mut file = open_for_write(path, overwrite).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

/// What a streaming sink got done, read once the barrier has settled.
#[derive(Debug, Default)]
struct SinkProgress {
    opened: AtomicBool,
    finished: AtomicBool,
}

impl SinkProgress {
    fn opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Sink used by streaming writes: appends `bytes` chunk by chunk.
async fn stream_to_file(
    path: PathBuf,
    bytes: Vec<u8>,
    overwrite: bool,
    name: String,
    progress: Arc<SinkProgress>,
) -> Result<()> {
    let sink_error = |e: io::Error| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            CacheError::AlreadyExists(name.clone())
        } else {
            CacheError::from_io(e, &path)
        }
    };

    let mut sink = open_for_write(&path, overwrite).await.map_err(sink_error)?;
    progress.opened.store(true, Ordering::SeqCst);
    for chunk in bytes.chunks(CHUNK_SIZE) {
        sink.write_all(chunk).await.map_err(sink_error)?;
    }
    sink.flush().await.map_err(sink_error)?;
    progress.finished.store(true, Ordering::SeqCst);
    Ok(())
}
