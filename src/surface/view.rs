//! Tile view: turns the held snapshot into frames.
//!
//! A frame lists the document's cells (entries of its top-level `scratches`
//! array) with their images. Images are requested through the cache, so a
//! frame that is still displayed keeps its images alive and re-rendering the
//! same cells sends nothing to the host.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use super::cache::ResourceCache;
use super::loader::LoadResult;
use super::store::{Origin, Revision, StateStore, ViewState};

/// Error state shown when the document text does not parse.
pub const INVALID_DOCUMENT: &str = "Document is not valid json";

/// One cell as declared by the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: Option<String>,
    pub href: Option<String>,
}

/// Parse document text into cells. Empty text is an empty document.
pub fn parse_cells(text: &str) -> serde_json::Result<Vec<Cell>> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    let document: Value = serde_json::from_str(text)?;

    let Some(entries) = document.get("scratches").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .map(|entry| Cell {
            text: string_field(entry, "text"),
            href: string_field(entry, "href"),
        })
        .collect())
}

fn string_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct RenderedCell {
    pub index: usize,
    pub text: Option<String>,
    pub href: Option<String>,
    /// `None` while loading or when the cell has no image
    pub image: Option<LoadResult>,
}

#[derive(Debug, Clone)]
pub enum Frame {
    /// Document text failed to parse; no tiles are shown
    Invalid {
        revision: u64,
        origin: Origin,
        message: &'static str,
    },
    Tiles {
        revision: u64,
        origin: Origin,
        cells: Vec<RenderedCell>,
        selected: Option<usize>,
    },
}

impl Frame {
    pub fn revision(&self) -> u64 {
        match self {
            Frame::Invalid { revision, .. } | Frame::Tiles { revision, .. } => *revision,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            Frame::Invalid { origin, .. } | Frame::Tiles { origin, .. } => *origin,
        }
    }

    pub fn cells(&self) -> &[RenderedCell] {
        match self {
            Frame::Invalid { .. } => &[],
            Frame::Tiles { cells, .. } => cells,
        }
    }

    /// Copy of this frame showing `selected`, `None` when nothing changes.
    pub fn with_selection(&self, selected: Option<usize>) -> Option<Frame> {
        match self {
            Frame::Tiles {
                revision,
                origin,
                cells,
                selected: current,
            } if *current != selected => Some(Frame::Tiles {
                revision: *revision,
                origin: *origin,
                cells: cells.clone(),
                selected,
            }),
            _ => None,
        }
    }

    /// Whether every declared image has settled.
    pub fn is_complete(&self) -> bool {
        self.cells()
            .iter()
            .all(|cell| cell.href.is_none() || cell.image.is_some())
    }
}

/// Renders revisions of a [`StateStore`] using a [`ResourceCache`].
#[derive(Clone)]
pub struct TileView {
    store: Arc<StateStore>,
    cache: ResourceCache,
}

impl TileView {
    pub fn new(store: Arc<StateStore>, cache: ResourceCache) -> Self {
        Self { store, cache }
    }

    /// Frame for `revision` showing only images that are already loaded.
    pub fn layout(&self, revision: &Revision) -> Frame {
        match parse_cells(&revision.snapshot.text) {
            Ok(cells) => {
                let images = hrefs(&cells)
                    .map(|href| self.cache.peek(href).map(Ok))
                    .collect();
                self.tiles(revision, cells, images)
            }
            Err(e) => {
                crate::debug!("surface"; "revision {} does not parse: {}", revision.number, e);
                Frame::Invalid {
                    revision: revision.number,
                    origin: revision.origin,
                    message: INVALID_DOCUMENT,
                }
            }
        }
    }

    /// Frame for `revision` with every image settled.
    ///
    /// Waits for as long as the host takes to answer.
    pub async fn render(&self, revision: &Revision) -> Frame {
        let cells = match parse_cells(&revision.snapshot.text) {
            Ok(cells) => cells,
            Err(_) => return self.layout(revision),
        };

        let loads = hrefs(&cells).map(|href| self.cache.get(href));
        let images = join_all(loads).await.into_iter().map(Some).collect();

        self.tiles(revision, cells, images)
    }

    /// `images` holds one entry per cell that declares an `href`.
    fn tiles(
        &self,
        revision: &Revision,
        cells: Vec<Cell>,
        images: Vec<Option<LoadResult>>,
    ) -> Frame {
        let selected = self.store.clamp_selection(cells.len());
        let mut images = images.into_iter();
        let cells = cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                let image = match cell.href {
                    Some(_) => images.next().flatten(),
                    None => None,
                };
                RenderedCell {
                    index,
                    text: cell.text,
                    href: cell.href,
                    image,
                }
            })
            .collect();

        Frame::Tiles {
            revision: revision.number,
            origin: revision.origin,
            cells,
            selected,
        }
    }

    /// Publish a frame for every revision until the frame receivers go away.
    ///
    /// A revision that arrives mid-render abandons the older render. A
    /// selection change republishes the current frame.
    pub async fn run(self, frames: watch::Sender<Option<Arc<Frame>>>) {
        let mut revisions = self.store.subscribe();
        let mut selection = self.store.watch_view();
        let mut next = self.wait_next(&mut revisions, &mut selection, &frames).await;

        while let Some(revision) = next.take() {
            frames.send_replace(Some(Arc::new(self.layout(&revision))));

            let render = self.render(&revision);
            tokio::pin!(render);
            next = loop {
                tokio::select! {
                    biased;
                    _ = frames.closed() => return,
                    newer = revisions.recv() => {
                        crate::debug!("surface"; "revision {} superseded while loading", revision.number);
                        break newer;
                    }
                    Ok(()) = selection.changed() => self.reselect(&frames),
                    frame = &mut render => {
                        frames.send_replace(Some(Arc::new(frame)));
                        break self.wait_next(&mut revisions, &mut selection, &frames).await;
                    }
                }
            };
        }
    }

    /// Next revision, republishing the current frame on selection changes.
    async fn wait_next(
        &self,
        revisions: &mut mpsc::UnboundedReceiver<Arc<Revision>>,
        selection: &mut watch::Receiver<ViewState>,
        frames: &watch::Sender<Option<Arc<Frame>>>,
    ) -> Option<Arc<Revision>> {
        loop {
            tokio::select! {
                revision = revisions.recv() => return revision,
                _ = frames.closed() => return None,
                Ok(()) = selection.changed() => self.reselect(frames),
            }
        }
    }

    fn reselect(&self, frames: &watch::Sender<Option<Arc<Frame>>>) {
        frames.send_if_modified(|slot| {
            let Some(frame) = slot.as_deref() else {
                return false;
            };
            let selected = self.store.clamp_selection(frame.cells().len());
            match frame.with_selection(selected) {
                Some(updated) => {
                    *slot = Some(Arc::new(updated));
                    true
                }
                None => false,
            }
        });
    }
}

fn hrefs(cells: &[Cell]) -> impl Iterator<Item = &str> {
    cells.iter().filter_map(|cell| cell.href.as_deref())
}
