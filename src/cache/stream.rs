//! Payload Stream Module
//!
//! Lazy, forward-only reads of a payload file.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::cache::Encoding;
use crate::error::{CacheError, Result};

/// Bytes read from disk per chunk
pub const CHUNK_SIZE: usize = 64 * 1024;

type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

// == Payload Stream ==
/// One-shot stream over the chunks of a payload file.
///
/// Chunks are raw file bytes; [`PayloadStream::read_to_string`] renders them
/// through the entry's encoding.
pub struct PayloadStream {
    path: PathBuf,
    encoding: Encoding,
    chunks: ChunkStream,
}

impl PayloadStream {
    // == Open ==
    /// Opens a payload file for reading.
    ///
    /// Resolves only after the file is open and confirmed to be a regular
    /// file. Fails with `NotFound` if it is missing.
    pub async fn open(path: impl Into<PathBuf>, encoding: Encoding) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)
            .await
            .map_err(|e| CacheError::from_io(e, &path))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| CacheError::from_io(e, &path))?;
        if !metadata.is_file() {
            return Err(CacheError::Io {
                path: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let chunks = stream::unfold(Some(file), |state| async move {
            let mut file = state?;
            let mut buf = vec![0u8; CHUNK_SIZE];
            match file.read(&mut buf).await {
                Ok(0) => None,
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok(buf), Some(file)))
                }
                // Stop after surfacing the first read error
                Err(e) => Some((Err(e), None)),
            }
        });

        Ok(Self {
            path,
            encoding,
            chunks: Box::pin(chunks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    // == Consumers ==
    /// Drains the stream into the raw payload bytes.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.chunks.next().await {
            let chunk = chunk.map_err(|e| CacheError::from_io(e, &self.path))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Drains the stream and decodes it with the entry's encoding.
    pub async fn read_to_string(self) -> Result<String> {
        let encoding = self.encoding;
        let bytes = self.read_to_end().await?;
        Ok(encoding.decode_bytes(&bytes))
    }
}

impl Stream for PayloadStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for PayloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadStream")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_file_fails_not_found() {
        let dir = TempDir::new().unwrap();
        let result = PayloadStream::open(dir.path().join("absent"), Encoding::Utf8).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_directory_fails() {
        let dir = TempDir::new().unwrap();
        let result = PayloadStream::open(dir.path(), Encoding::Utf8).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big");
        let content: Vec<u8> = (0..(CHUNK_SIZE * 2 + 10)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let mut stream = PayloadStream::open(&path, Encoding::Binary).await.unwrap();
        let mut sizes = Vec::new();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            sizes.push(chunk.len());
            collected.extend(chunk);
        }

        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 10]);
        assert_eq!(collected, content);
    }

    #[tokio::test]
    async fn test_read_to_string_uses_encoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hex");
        std::fs::write(&path, [0xCA, 0xFE]).unwrap();

        let stream = PayloadStream::open(&path, Encoding::Hex).await.unwrap();
        assert_eq!(stream.read_to_string().await.unwrap(), "cafe");
    }

    #[tokio::test]
    async fn test_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let stream = PayloadStream::open(&path, Encoding::Utf8).await.unwrap();
        assert!(stream.read_to_end().await.unwrap().is_empty());
    }
}
