//! Persisted state slot surviving surface reloads.
//!
//! Written on every snapshot, read once at startup.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::store::ViewState;
use crate::protocol::DocumentSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub snapshot: Option<DocumentSnapshot>,
    #[serde(default)]
    pub selected_cell: Option<usize>,
}

impl PersistedState {
    pub fn view_state(&self) -> ViewState {
        ViewState {
            selected_cell: self.selected_cell,
        }
    }
}

/// Storage for [`PersistedState`]. Failures are logged, never returned.
pub trait StateSlot: Send + Sync + 'static {
    fn load(&self) -> Option<PersistedState>;
    fn save(&self, state: &PersistedState);
}

/// In-memory slot, for tests and one-shot renders.
#[derive(Debug, Default)]
pub struct MemoryStateSlot {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl StateSlot for MemoryStateSlot {
    fn load(&self) -> Option<PersistedState> {
        self.state.lock().clone()
    }

    fn save(&self, state: &PersistedState) {
        *self.state.lock() = Some(state.clone());
    }
}

/// JSON file slot.
#[derive(Debug, Clone)]
pub struct FileStateSlot {
    path: PathBuf,
}

impl FileStateSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateSlot for FileStateSlot {
    fn load(&self) -> Option<PersistedState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                crate::log!("error"; "cannot read state {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                crate::log!("anomaly"; "ignoring corrupt state {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, state: &PersistedState) {
        let result = serde_json::to_vec(state)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&self.path, bytes));
        if let Err(e) = result {
            crate::log!("error"; "cannot save state {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_slot_round_trip() {
        let dir = TempDir::new().unwrap();
        let slot = FileStateSlot::new(dir.path().join("state.json"));
        assert!(slot.load().is_none());

        let state = PersistedState {
            snapshot: Some(DocumentSnapshot::new("doc://a", r#"{"scratches":[]}"#)),
            selected_cell: Some(0),
        };
        slot.save(&state);
        assert_eq!(slot.load(), Some(state));
    }

    #[test]
    fn test_file_slot_ignores_corrupt_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(FileStateSlot::new(path).load().is_none());
    }

    #[test]
    fn test_persisted_state_wire_shape() {
        let state = PersistedState {
            snapshot: Some(DocumentSnapshot::new("doc://a", "{}")),
            selected_cell: None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["snapshot"]["locator"], "doc://a");
        assert!(json["selectedCell"].is_null());
    }
}
