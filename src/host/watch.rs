//! Filesystem watcher for the backing document.
//!
//! Publishes edits made outside the bridge (another editor, `git checkout`)
//! to the [`Workspace`]. Watches the parent directory because atomic saves
//! replace the file rather than modify it.
//!
//! ```text
//! notify --> debounce (pure timing) --> Workspace::notify_changed
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::HostError;
use super::document::{Workspace, is_temp_file};
use crate::protocol::Locator;

pub(super) const DEBOUNCE_MS: u64 = 50;

/// Keeps the watcher alive; dropping it stops notifications.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
}

impl DocumentWatcher {
    /// Start watching `path`, announcing changes under `locator`.
    pub fn start(path: &Path, locator: Locator, workspace: Workspace) -> Result<Self, HostError> {
        let (notify_tx, notify_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .map_err(|e| HostError::Io(path.to_path_buf(), std::io::Error::other(e)))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| HostError::Io(dir.to_path_buf(), std::io::Error::other(e)))?;

        let target = path.to_path_buf();
        std::thread::spawn(move || {
            let mut debouncer = Debouncer::new(target);
            loop {
                match notify_rx.recv_timeout(debouncer.sleep_duration()) {
                    Ok(Ok(event)) => debouncer.add_event(&event),
                    Ok(Err(e)) => crate::log!("watch"; "notify error: {}", e),
                    Err(RecvTimeoutError::Timeout) => {}
                    // Watcher dropped
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if debouncer.take_if_ready() {
                    crate::debug!("watch"; "document changed on disk: {}", locator);
                    workspace.notify_changed(&locator);
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

/// Pure debouncer: collapses a burst of events on one file into one change.
struct Debouncer {
    target: PathBuf,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(target: PathBuf) -> Self {
        Self {
            target,
            last_event: None,
        }
    }

    fn add_event(&mut self, event: &notify::Event) {
        let relevant = match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => true,
            // Metadata-only changes (mtime/chmod) carry no content
            EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
            _ => false,
        };
        if !relevant {
            return;
        }

        let touches_target = event
            .paths
            .iter()
            .any(|p| !is_temp_file(p) && same_file(p, &self.target));
        if touches_target {
            self.last_event = Some(Instant::now());
        }
    }

    fn take_if_ready(&mut self) -> bool {
        match self.last_event {
            Some(at) if at.elapsed() >= Duration::from_millis(DEBOUNCE_MS) => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }

    fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(at) => Duration::from_millis(DEBOUNCE_MS).saturating_sub(at.elapsed()),
            None => Duration::from_millis(DEBOUNCE_MS * 10),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || a.canonicalize().is_ok_and(|a| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modify_event(path: &str) -> notify::Event {
        notify::Event {
            kind: EventKind::Modify(notify::event::ModifyKind::Data(
                notify::event::DataChange::Any,
            )),
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_debouncer_ignores_other_files() {
        let mut debouncer = Debouncer::new(PathBuf::from("/notes/board.json"));
        debouncer.add_event(&modify_event("/notes/other.json"));
        debouncer.add_event(&modify_event("/notes/.board.json.tilebridge-tmp"));
        assert!(debouncer.last_event.is_none());
    }

    #[test]
    fn test_debouncer_collapses_burst() {
        let mut debouncer = Debouncer::new(PathBuf::from("/notes/board.json"));
        debouncer.add_event(&modify_event("/notes/board.json"));
        debouncer.add_event(&modify_event("/notes/board.json"));
        assert!(!debouncer.take_if_ready());

        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 10));
        assert!(debouncer.take_if_ready());
        assert!(!debouncer.take_if_ready());
    }

    #[test]
    fn test_debouncer_ignores_metadata() {
        let mut debouncer = Debouncer::new(PathBuf::from("/notes/board.json"));
        let event = notify::Event {
            kind: EventKind::Modify(notify::event::ModifyKind::Metadata(
                notify::event::MetadataKind::Any,
            )),
            paths: vec![PathBuf::from("/notes/board.json")],
            attrs: Default::default(),
        };
        debouncer.add_event(&event);
        assert!(debouncer.last_event.is_none());
    }
}
