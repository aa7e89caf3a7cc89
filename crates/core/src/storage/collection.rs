//! Durable key/value collections.
//!
//! A [`StorageBackend`] opens named collections; each [`CollectionHandle`]
//! stores opaque byte values under string keys. [`FileBackend`] keeps one
//! directory per collection with one checksummed file per key.
//! [`MemoryBackend`] keeps everything in a shared in-process map.

use crate::config;
use crate::storage::persistence;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opens and purges named collections.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Opens `name`, creating its storage on first use.
    fn open(&self, name: &str) -> io::Result<Box<dyn CollectionHandle>>;

    /// Deletes `name` and everything stored in it. Deleting an absent collection succeeds.
    fn delete(&self, name: &str) -> io::Result<()>;
}

/// An open collection.
pub trait CollectionHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> io::Result<()>;
}

/// Checks a collection name or key: 1-128 characters from `[A-Za-z0-9_.-]`,
/// not starting with `.`.
pub fn validate_name(name: &str) -> io::Result<()> {
    let invalid = |msg: String| Err(io::Error::new(io::ErrorKind::InvalidInput, msg));

    if name.is_empty() || name.len() > config::MAX_NAME_LEN {
        return invalid(format!(
            "name must be 1-{} characters, got {}",
            config::MAX_NAME_LEN,
            name.len()
        ));
    }
    if name.starts_with('.') {
        return invalid(format!("name '{name}' must not start with '.'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return invalid(format!(
            "name '{name}' must contain only alphanumeric characters, '_', '-', or '.'"
        ));
    }
    Ok(())
}

/// Filesystem backend: `<root>/<collection>/<key>`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, name: &str) -> io::Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new(config::DEFAULT_DATA_DIR)
    }
}

impl StorageBackend for FileBackend {
    fn open(&self, name: &str) -> io::Result<Box<dyn CollectionHandle>> {
        let dir = self.collection_dir(name)?;
        persistence::ensure_dir(&dir)?;
        tracing::debug!("Opened collection '{}' at {:?}", name, dir);
        Ok(Box::new(FileCollection {
            name: name.to_string(),
            dir,
        }))
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        let dir = self.collection_dir(name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug)]
struct FileCollection {
    name: String,
    dir: PathBuf,
}

impl CollectionHandle for FileCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        validate_name(key)?;
        persistence::read_checked(&self.dir.join(key))
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        validate_name(key)?;
        // The directory may have been purged through another backend instance.
        persistence::ensure_dir(&self.dir)?;
        persistence::write_checked(&self.dir.join(key), value)
    }
}

type SharedMap = Arc<RwLock<HashMap<String, HashMap<String, Vec<u8>>>>>;

/// In-process backend. Clones share the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    collections: SharedMap,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all open collections.
    pub fn list_collections(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }
}

impl StorageBackend for MemoryBackend {
    fn open(&self, name: &str) -> io::Result<Box<dyn CollectionHandle>> {
        validate_name(name)?;
        self.collections
            .write()
            .entry(name.to_string())
            .or_default();
        Ok(Box::new(MemoryCollection {
            name: name.to_string(),
            collections: Arc::clone(&self.collections),
        }))
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        validate_name(name)?;
        self.collections.write().remove(name);
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryCollection {
    name: String,
    collections: SharedMap,
}

impl CollectionHandle for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        validate_name(key)?;
        Ok(self
            .collections
            .read()
            .get(&self.name)
            .and_then(|values| values.get(key))
            .cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        validate_name(key)?;
        self.collections
            .write()
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("hnsw").is_ok());
        assert!(validate_name("my-index_v2.0").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name(".hnsw.tmp").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a b").is_err());
        assert!(validate_name(&"x".repeat(128)).is_ok());
        assert!(validate_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open("docs").unwrap();
        assert_eq!(handle.name(), "docs");
        assert!(handle.get("hnsw").unwrap().is_none());

        handle.put("hnsw", b"first").unwrap();
        handle.put("hnsw", b"second").unwrap();
        assert_eq!(handle.get("hnsw").unwrap().unwrap(), b"second");

        let reopened = backend.open("docs").unwrap();
        assert_eq!(reopened.get("hnsw").unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_file_backend_delete() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open("docs").unwrap();
        handle.put("meta", b"m").unwrap();

        backend.delete("docs").unwrap();
        assert!(!dir.path().join("docs").exists());
        assert!(handle.get("meta").unwrap().is_none());
        backend.delete("docs").unwrap();
    }

    #[test]
    fn test_file_backend_keys_with_tmp_suffix() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        let handle = backend.open("docs").unwrap();
        handle.put("hnsw.tmp", b"staged").unwrap();
        handle.put("hnsw", b"live").unwrap();
        handle.put("hnsw", b"live-2").unwrap();

        assert_eq!(handle.get("hnsw.tmp").unwrap().unwrap(), b"staged");
        assert_eq!(handle.get("hnsw").unwrap().unwrap(), b"live-2");
        assert!(handle.get(".hnsw.tmp").is_err());
    }

    #[test]
    fn test_file_backend_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        let err = backend.open("../escape").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let handle = backend.open("docs").unwrap();
        assert!(handle.put("../meta", b"x").is_err());
    }

    #[test]
    fn test_memory_backend_shared_between_clones() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.open("a").unwrap().put("hnsw", b"v").unwrap();

        assert_eq!(other.open("a").unwrap().get("hnsw").unwrap().unwrap(), b"v");
        assert_eq!(other.list_collections(), vec!["a".to_string()]);

        other.delete("a").unwrap();
        assert!(backend.open("a").unwrap().get("hnsw").unwrap().is_none());
    }
}
