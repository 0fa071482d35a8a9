//! Reactive State Store - the surface's single current snapshot.
//!
//! Every replacement is delivered to every subscriber as a [`Revision`], in
//! order, over its own channel. Readers load the current value lock-free.
//! The view-local [`ViewState`] is a `watch` so views can follow selection
//! changes between revisions.
//!
//! ```text
//! Uninitialized --first host update--> Active
//! ```

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::protocol::DocumentSnapshot;

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Persisted state read at startup
    Restored,
    /// An `update` from the host
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Active,
}

/// One replacement of the held snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Increases by one per replacement, starting at 1
    pub number: u64,
    pub origin: Origin,
    pub snapshot: Arc<DocumentSnapshot>,
}

/// Surface-local view state that survives snapshot replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selected_cell: Option<usize>,
}

pub struct StateStore {
    current: ArcSwapOption<Revision>,
    /// Held while replacing so fan-out order matches revision order
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Arc<Revision>>>>,
    view: watch::Sender<ViewState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            subscribers: Mutex::new(Vec::new()),
            view: watch::channel(ViewState::default()).0,
        }
    }

    /// Seed the store from persisted state.
    ///
    /// Ignored once anything has been stored.
    pub fn restore(&self, snapshot: DocumentSnapshot, view: ViewState) -> bool {
        let mut subscribers = self.subscribers.lock();
        if self.current.load_full().is_some() {
            return false;
        }
        self.view.send_replace(view);
        self.publish(&mut subscribers, snapshot, Origin::Restored);
        true
    }

    /// Replace the held snapshot wholesale with one from the host.
    pub fn replace(&self, snapshot: DocumentSnapshot) -> Arc<Revision> {
        let mut subscribers = self.subscribers.lock();
        self.publish(&mut subscribers, snapshot, Origin::Host)
    }

    fn publish(
        &self,
        subscribers: &mut Vec<mpsc::UnboundedSender<Arc<Revision>>>,
        snapshot: DocumentSnapshot,
        origin: Origin,
    ) -> Arc<Revision> {
        let number = self.current.load_full().map_or(0, |r| r.number) + 1;
        let revision = Arc::new(Revision {
            number,
            origin,
            snapshot: Arc::new(snapshot),
        });
        self.current.store(Some(Arc::clone(&revision)));

        subscribers.retain(|tx| tx.send(Arc::clone(&revision)).is_ok());
        revision
    }

    /// Current revision, `None` before anything has been stored.
    pub fn current(&self) -> Option<Arc<Revision>> {
        self.current.load_full()
    }

    pub fn snapshot(&self) -> Option<Arc<DocumentSnapshot>> {
        self.current().map(|r| Arc::clone(&r.snapshot))
    }

    /// Number of the current revision, 0 before anything has been stored.
    pub fn revision(&self) -> u64 {
        self.current.load_full().map_or(0, |r| r.number)
    }

    pub fn phase(&self) -> Phase {
        match self.current.load_full() {
            Some(r) if r.origin == Origin::Host => Phase::Active,
            _ => Phase::Uninitialized,
        }
    }

    /// Receive every future revision, starting with the current one if any.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<Revision>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();
        if let Some(current) = self.current.load_full() {
            let _ = tx.send(current);
        }
        subscribers.push(tx);
        rx
    }

    pub fn view_state(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Follow changes to the view state.
    pub fn watch_view(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Returns whether the selection changed.
    pub fn select_cell(&self, index: Option<usize>) -> bool {
        self.view.send_if_modified(|view| {
            let changed = view.selected_cell != index;
            view.selected_cell = index;
            changed
        })
    }

    /// Clear the selection when it points past the last of `cell_count` cells.
    pub fn clamp_selection(&self, cell_count: usize) -> Option<usize> {
        let mut selected = None;
        self.view.send_if_modified(|view| {
            let out_of_range = view.selected_cell.is_some_and(|i| i >= cell_count);
            if out_of_range {
                view.selected_cell = None;
            }
            selected = view.selected_cell;
            out_of_range
        });
        selected
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
