//! Local filesystem store.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, trace};

use super::{is_hidden, matches_extension, BlobStore, StorageError};

/// Store backed by the local filesystem.
///
/// Paths are used as given: relative paths resolve against the working
/// directory.
#[derive(Debug, Clone, Default)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(path: &str, source: std::io::Error) -> StorageError {
    if source.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl BlobStore for LocalStore {
    fn list(&self, dir: &str, extension: Option<&str>) -> Result<Vec<String>, StorageError> {
        if !Path::new(dir).is_dir() {
            return Err(StorageError::NotFound(dir.to_string()));
        }

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(dir.trim_end_matches('/'))
        );
        let entries = glob::glob(&pattern).map_err(|e| StorageError::Pattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_string_lossy().into_owned();
                StorageError::Io {
                    path,
                    source: e.into_error(),
                }
            })?;
            if !path.is_file() {
                continue;
            }
            let path = path.to_string_lossy().replace('\\', "/");
            if is_hidden(&path) || !matches_extension(&path, extension) {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        debug!(dir = dir, count = paths.len(), "Listed local directory");
        Ok(paths)
    }

    fn get_bytes(&self, path: &str) -> Result<Bytes, StorageError> {
        let data = fs::read(path).map_err(|e| io_error(path, e))?;
        trace!(path = path, bytes = data.len(), "Read local blob");
        Ok(Bytes::from(data))
    }

    fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
            }
        }
        fs::write(path, bytes).map_err(|e| io_error(path, e))?;
        trace!(path = path, bytes = bytes.len(), "Wrote local blob");
        Ok(())
    }
}
