//! Document stores and change notifications.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::HostError;
use crate::protocol::Locator;

/// Capacity of the change broadcast; lagging receivers resync on the next recv.
const CHANGE_BUFFER: usize = 64;

/// Change notification source shared by every document of a host.
///
/// Publishes the locator of each document that changed; the bridge filters
/// for the one it owns.
#[derive(Debug, Clone)]
pub struct Workspace {
    tx: broadcast::Sender<Locator>,
}

impl Workspace {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Locator> {
        self.tx.subscribe()
    }

    /// Announce that the document at `locator` changed.
    pub fn notify_changed(&self, locator: &Locator) {
        // No receivers is fine: nobody has attached yet
        let _ = self.tx.send(locator.clone());
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Text accessor/replacer scoped to one document.
pub trait DocumentStore: Send + Sync + 'static {
    fn locator(&self) -> &Locator;

    /// Current full text.
    fn text(&self) -> Result<String, HostError>;

    /// Replace the entire content in one edit and announce the change.
    fn replace_all(&self, text: &str) -> Result<(), HostError>;
}

// ============================================================================
// Memory document
// ============================================================================

/// In-memory document, used by tests and embedders with their own storage.
#[derive(Debug)]
pub struct MemoryDocument {
    locator: Locator,
    text: Mutex<String>,
    workspace: Workspace,
}

impl MemoryDocument {
    pub fn new(locator: impl Into<Locator>, text: impl Into<String>, workspace: Workspace) -> Self {
        Self {
            locator: locator.into(),
            text: Mutex::new(text.into()),
            workspace,
        }
    }
}

impl DocumentStore for MemoryDocument {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn text(&self) -> Result<String, HostError> {
        Ok(self.text.lock().clone())
    }

    fn replace_all(&self, text: &str) -> Result<(), HostError> {
        *self.text.lock() = text.to_string();
        self.workspace.notify_changed(&self.locator);
        Ok(())
    }
}

// ============================================================================
// File document
// ============================================================================

/// Document backed by a file on disk.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// reader never sees a half-written document.
#[derive(Debug)]
pub struct FileDocument {
    locator: Locator,
    path: PathBuf,
    workspace: Workspace,
}

impl FileDocument {
    /// Open an existing document file.
    pub fn open(path: &Path, workspace: Workspace) -> Result<Self, HostError> {
        let path = path
            .canonicalize()
            .map_err(|e| HostError::Io(path.to_path_buf(), e))?;
        Ok(Self {
            locator: Locator::from_path(&path),
            path,
            workspace,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the document (base for relative resources).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tilebridge-tmp"))
    }
}

impl DocumentStore for FileDocument {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn text(&self) -> Result<String, HostError> {
        fs::read_to_string(&self.path).map_err(|e| HostError::Io(self.path.clone(), e))
    }

    fn replace_all(&self, text: &str) -> Result<(), HostError> {
        let temp = self.temp_path();
        fs::write(&temp, text).map_err(|e| HostError::Io(temp.clone(), e))?;
        fs::rename(&temp, &self.path).map_err(|e| HostError::Io(self.path.clone(), e))?;
        self.workspace.notify_changed(&self.locator);
        Ok(())
    }
}

/// True for the temp files `FileDocument` writes before renaming.
pub(super) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".tilebridge-tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_document_replace_notifies() {
        let workspace = Workspace::new();
        let mut changes = workspace.subscribe();
        let doc = MemoryDocument::new("doc://a", "{}", workspace.clone());

        doc.replace_all("{\"scratches\":[]}").unwrap();

        assert_eq!(doc.text().unwrap(), "{\"scratches\":[]}");
        assert_eq!(changes.recv().await.unwrap(), Locator::new("doc://a"));
    }

    #[test]
    fn test_file_document_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, "{}").unwrap();

        let workspace = Workspace::new();
        let mut changes = workspace.subscribe();
        let doc = FileDocument::open(&path, workspace).unwrap();
        assert!(doc.locator().as_str().starts_with("file://"));
        assert!(doc.locator().as_str().ends_with("board.json"));
        assert_eq!(doc.text().unwrap(), "{}");

        doc.replace_all("{\n  \"scratches\": []\n}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\n  \"scratches\": []\n}");
        assert!(!doc.temp_path().exists());
        assert_eq!(changes.try_recv().unwrap(), doc.locator().clone());
    }

    #[test]
    fn test_file_document_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileDocument::open(&dir.path().join("nope.json"), Workspace::new()).unwrap_err();
        assert!(matches!(err, HostError::Io(..)));
    }

    #[test]
    fn test_temp_file_detection() {
        assert!(is_temp_file(Path::new("/x/.board.json.tilebridge-tmp")));
        assert!(!is_temp_file(Path::new("/x/board.json")));
    }
}
