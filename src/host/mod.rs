//! Host side of the bridge.
//!
//! The host owns the authoritative document text and the filesystem:
//!
//! ```text
//! DocumentStore --changed--> Workspace --locator--> SyncBridge --update--> surface
//!       ^                                               |
//!       +-------------- replace_all (update) -----------+
//! ResourceReader <--------- read (loadImage) -----------+
//! ```
//!
//! - `document` - document store trait, change workspace, memory/file stores
//! - `resource` - resource reader trait, filesystem and memory readers
//! - `watch` - filesystem watcher publishing external edits
//! - `bridge` - the sync bridge event loop

pub mod bridge;
pub mod document;
pub mod resource;
pub mod watch;

use std::path::PathBuf;

use thiserror::Error;

pub use bridge::{SyncBridge, SyncOptions, serialize_document};
pub use document::{DocumentStore, FileDocument, MemoryDocument, Workspace};
pub use resource::{FsResources, MemoryResources, ResourceReader};
pub use watch::DocumentWatcher;

/// Host-side errors. None of them are fatal to the bridge.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unsupported resource location `{0}`")]
    UnsupportedLocation(String),

    #[error("resource `{0}` not found")]
    NotFound(String),

    #[error("cannot serialize document")]
    Serialize(#[from] serde_json::Error),
}
