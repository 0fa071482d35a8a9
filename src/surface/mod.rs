//! Render surface - the sandboxed half of the protocol.
//!
//! ```text
//! host --update-->            Surface --replace--> StateStore --> TileView
//! host --loadImageResponse--> Surface --resolve--> ResourceLoader <-- ResourceCache
//! ```
//!
//! - `loader` - `loadImage` correlation by request id
//! - `cache` - deduplicating, weakly-retaining resource cache
//! - `store` - current snapshot and its subscribers
//! - `slot` - persisted state across reloads
//! - `view` - frames built from snapshots

pub mod cache;
pub mod loader;
pub mod slot;
pub mod store;
pub mod view;

pub use cache::{CacheStats, ResourceCache};
pub use loader::{LoadError, LoadResult, Resolution, ResourceLoader};
pub use slot::{FileStateSlot, MemoryStateSlot, PersistedState, StateSlot};
pub use store::{Origin, Phase, Revision, StateStore, ViewState};
pub use view::{Frame, RenderedCell, TileView};

use std::sync::Arc;

use crate::channel::{ChannelError, Inbox, Outbox, SurfaceEndpoint};
use crate::protocol::{DocumentSnapshot, HostMessage, SurfaceMessage};

/// Surface side of one session: dispatches host messages into the store
/// and the loader.
pub struct Surface {
    store: Arc<StateStore>,
    cache: ResourceCache,
    slot: Arc<dyn StateSlot>,
    outbox: Outbox<SurfaceMessage>,
    inbox: Inbox<HostMessage>,
}

impl Surface {
    /// Create a surface, seeding the store from `slot` when it holds state.
    pub fn new(endpoint: SurfaceEndpoint, slot: Arc<dyn StateSlot>) -> Self {
        let (outbox, inbox) = endpoint.split();
        let cache = ResourceCache::new(ResourceLoader::new(outbox.clone()));
        let store = Arc::new(StateStore::new());

        if let Some(state) = slot.load()
            && let Some(snapshot) = state.snapshot.clone()
        {
            crate::debug!("surface"; "restored {}", snapshot.locator);
            store.restore(snapshot, state.view_state());
        }

        Self {
            store,
            cache,
            slot,
            outbox,
            inbox,
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn loader(&self) -> &ResourceLoader {
        self.cache.loader()
    }

    pub fn view(&self) -> TileView {
        TileView::new(Arc::clone(&self.store), self.cache.clone())
    }

    pub fn handle(&self) -> SurfaceHandle {
        SurfaceHandle {
            outbox: self.outbox.clone(),
            store: Arc::clone(&self.store),
            slot: Arc::clone(&self.slot),
        }
    }

    /// Dispatch host messages until the host goes away.
    pub async fn run(mut self) {
        while let Some(message) = self.inbox.recv().await {
            self.dispatch(message);
        }
        crate::debug!("surface"; "host closed the channel");
    }

    fn dispatch(&self, message: HostMessage) {
        match message {
            HostMessage::Update { uri, text } => {
                let revision = self.store.replace(DocumentSnapshot::new(uri, text));
                crate::debug!("surface"; "revision {} ({} bytes)", revision.number, revision.snapshot.text.len());
                persist(&self.store, self.slot.as_ref());
            }
            HostMessage::LoadImageResponse { id, text } => {
                self.loader().resolve(&id, &text);
            }
        }
    }
}

/// Save the current snapshot with a selection that fits its cells.
fn persist(store: &StateStore, slot: &dyn StateSlot) {
    let Some(revision) = store.current() else {
        return;
    };
    // An unparsable document shows no cells but keeps its selection
    if let Ok(cells) = view::parse_cells(&revision.snapshot.text) {
        store.clamp_selection(cells.len());
    }
    slot.save(&PersistedState {
        snapshot: Some(DocumentSnapshot::clone(&revision.snapshot)),
        selected_cell: store.view_state().selected_cell,
    });
}

/// Cloneable handle for view fragments that edit the document.
#[derive(Clone)]
pub struct SurfaceHandle {
    outbox: Outbox<SurfaceMessage>,
    store: Arc<StateStore>,
    slot: Arc<dyn StateSlot>,
}

impl SurfaceHandle {
    /// Send the edited document to the host.
    ///
    /// Nothing changes locally; the edit comes back as the host's next `update`.
    pub fn commit(&self, map: serde_json::Value) -> Result<(), ChannelError> {
        self.outbox.send(SurfaceMessage::Update { map })
    }

    /// Select a cell; running views republish and the slot is rewritten.
    pub fn select_cell(&self, index: Option<usize>) {
        if self.store.select_cell(index) {
            persist(&self.store, self.slot.as_ref());
        }
    }
}
