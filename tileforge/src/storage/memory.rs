//! In-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{is_hidden, matches_extension, BlobStore, StorageError};

/// Store keeping every blob in a shared sorted map.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.blobs.read().keys().cloned().collect()
    }
}

impl BlobStore for MemoryStore {
    fn list(&self, dir: &str, extension: Option<&str>) -> Result<Vec<String>, StorageError> {
        let prefix = match dir.trim_end_matches('/') {
            "" => String::new(),
            d => format!("{}/", d),
        };

        Ok(self
            .blobs
            .read()
            .range(prefix.clone()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(&prefix))
            .filter(|path| !is_hidden(path) && matches_extension(path, extension))
            .cloned()
            .collect())
    }

    fn get_bytes(&self, path: &str) -> Result<Bytes, StorageError> {
        self.blobs
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.blobs
            .write()
            .insert(path.to_string(), Bytes::copy_from_slice(bytes));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = MemoryStore::new();
        store.put_string("data/manifest.json", "{}").unwrap();
        assert_eq!(store.get_bytes("data/manifest.json").unwrap().as_ref(), b"{}");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_blob() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_bytes("nope"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_respects_directory_boundary() {
        let store = MemoryStore::new();
        store.put_bytes("src/a_geotiff.tif", b"1").unwrap();
        store.put_bytes("src/sub/b_udm.tif", b"2").unwrap();
        store.put_bytes("src/.hidden.tif", b"3").unwrap();
        store.put_bytes("src/a.json", b"4").unwrap();
        store.put_bytes("src2/c.tif", b"5").unwrap();

        let listed = store.list("src", Some(".tif")).unwrap();
        assert_eq!(listed, vec!["src/a_geotiff.tif", "src/sub/b_udm.tif"]);
        assert_eq!(store.list("src/", None).unwrap().len(), 3);
        assert_eq!(store.list("", None).unwrap().len(), 4);
    }

    #[test]
    fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.put_string("x", "y").unwrap();
        assert_eq!(store.paths(), vec!["x"]);
    }
}
