//! Document locator and snapshot types.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque address of the backing document (e.g. `file:///notes/board.json`).
///
/// Cheap to clone; compared by its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(Arc<str>);

impl Locator {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// Locator for a file on disk, in `file://` URL form when the path is absolute.
    pub fn from_path(path: &std::path::Path) -> Self {
        match url::Url::from_file_path(path) {
            Ok(url) => Self::new(url.as_str()),
            Err(()) => Self::new(path.to_string_lossy()),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Locator {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Locator {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Complete document content at one point in time.
///
/// A new snapshot always replaces the previous one wholesale; snapshots are
/// never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub locator: Locator,
    pub text: String,
}

impl DocumentSnapshot {
    pub fn new(locator: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            text: text.into(),
        }
    }
}
