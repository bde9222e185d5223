//! Blob storage abstraction
//!
//! Both pipelines read and write through a minimal byte-oriented store:
//! listing a directory, reading a blob, writing a blob. Paths are plain
//! `/`-separated strings so the same manifest works against local disk and
//! object stores.
//!
//! # Backends
//!
//! - [`LocalStore`]: local filesystem
//! - [`MemoryStore`]: in-process map, used by tests and dry runs

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use bytes::Bytes;
use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob exists at the path
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Underlying I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing pattern could not be built
    #[error("Invalid listing pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },
}

/// Byte-oriented store shared by the pipelines.
///
/// Implementations must be safe to call from several tasks at once.
pub trait BlobStore: Send + Sync {
    /// Lists blob paths under `dir`, recursively, in sorted order.
    ///
    /// Hidden files (name starting with `.`) are skipped. When `extension`
    /// is given only paths ending with it are returned.
    fn list(&self, dir: &str, extension: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Reads a whole blob.
    fn get_bytes(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Writes a whole blob, creating parent directories as needed.
    fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Writes a UTF-8 string blob.
    fn put_string(&self, path: &str, contents: &str) -> Result<(), StorageError> {
        self.put_bytes(path, contents.as_bytes())
    }

    /// Joins path segments with `/`.
    fn join(&self, segments: &[&str]) -> String {
        join_segments(segments)
    }
}

/// Joins path segments with `/`, collapsing duplicate separators.
///
/// A leading `/` on the first segment is kept; empty segments are dropped.
/// Backslashes are normalized to `/`.
pub fn join_segments(segments: &[&str]) -> String {
    let mut joined = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.replace('\\', "/");
        let trimmed = if i == 0 {
            segment.trim_end_matches('/')
        } else {
            segment.trim_matches('/')
        };
        if trimmed.is_empty() {
            if i == 0 && segment.starts_with('/') {
                joined.push('/');
            }
            continue;
        }
        if !joined.is_empty() && !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(trimmed);
    }
    joined
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_hidden(path: &str) -> bool {
    file_name(path).starts_with('.')
}

fn matches_extension(path: &str, extension: Option<&str>) -> bool {
    extension.map_or(true, |ext| path.ends_with(ext))
}
