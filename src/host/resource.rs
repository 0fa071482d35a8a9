//! Resource readers: raw bytes for the identifiers a surface asks for.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use super::HostError;
use crate::utils::mime;

/// Binary resource reader keyed by resource locator.
pub trait ResourceReader: Send + Sync + 'static {
    fn read(&self, uri: &str) -> Result<Vec<u8>, HostError>;

    /// MIME type to advertise for `uri`, `None` when unknown.
    fn mime_for(&self, uri: &str) -> Option<&'static str> {
        guess_mime(uri)
    }
}

/// Guess a MIME type from the extension of the URI's path component.
pub fn guess_mime(uri: &str) -> Option<&'static str> {
    match Url::parse(uri) {
        Ok(url) => mime::from_path(Path::new(url.path())),
        Err(_) => mime::from_path(Path::new(uri)),
    }
}

// ============================================================================
// Filesystem reader
// ============================================================================

/// Reads `file://` URLs and paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsResources {
    root: PathBuf,
}

impl FsResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a resource locator to a filesystem path.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, HostError> {
        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|()| HostError::UnsupportedLocation(uri.to_string())),
            Ok(_) => Err(HostError::UnsupportedLocation(uri.to_string())),
            Err(_) => Ok(self.root.join(uri)),
        }
    }
}

impl ResourceReader for FsResources {
    fn read(&self, uri: &str) -> Result<Vec<u8>, HostError> {
        let path = self.resolve(uri)?;
        std::fs::read(&path).map_err(|e| HostError::Io(path, e))
    }
}

// ============================================================================
// Memory reader
// ============================================================================

/// In-memory resources with a read counter, for tests.
#[derive(Debug, Default)]
pub struct MemoryResources {
    entries: Mutex<FxHashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().insert(uri.into(), bytes.into());
    }

    /// Number of successful and failed reads so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ResourceReader for MemoryResources {
    fn read(&self, uri: &str) -> Result<Vec<u8>, HostError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| HostError::NotFound(uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("img://tiles/grass.png"), Some(mime::types::PNG));
        assert_eq!(guess_mime("file:///a/b/photo.jpg"), Some(mime::types::JPEG));
        assert_eq!(guess_mime("tiles/water.webp"), Some(mime::types::WEBP));
        assert_eq!(guess_mime("img://x"), None);
    }

    #[test]
    fn test_fs_resources_relative_and_file_url() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tiles")).unwrap();
        let file = dir.path().join("tiles/a.png");
        std::fs::write(&file, [1u8, 2, 3]).unwrap();

        let reader = FsResources::new(dir.path());
        assert_eq!(reader.read("tiles/a.png").unwrap(), vec![1, 2, 3]);

        let url = Url::from_file_path(&file).unwrap();
        assert_eq!(reader.read(url.as_str()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fs_resources_rejects_other_schemes() {
        let reader = FsResources::new("/tmp");
        assert!(matches!(
            reader.read("https://example.com/a.png"),
            Err(HostError::UnsupportedLocation(_))
        ));
    }

    #[test]
    fn test_fs_resources_missing_file() {
        let dir = TempDir::new().unwrap();
        let reader = FsResources::new(dir.path());
        assert!(matches!(reader.read("missing.png"), Err(HostError::Io(..))));
    }

    #[test]
    fn test_memory_resources_counts_reads() {
        let reader = MemoryResources::new();
        reader.insert("img://x", vec![9u8]);
        assert_eq!(reader.read("img://x").unwrap(), vec![9]);
        assert!(reader.read("img://y").is_err());
        assert_eq!(reader.reads(), 2);
    }
}
