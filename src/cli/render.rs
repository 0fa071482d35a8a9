//! `render` command: host and surface in one process, print one frame.
//!
//! Useful to check what a surface would show for a document without a
//! browser attached.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tokio::sync::watch;

use crate::channel::bridge_pair;
use crate::config::BridgeConfig;
use crate::host::{FileDocument, FsResources, SyncBridge, Workspace};
use crate::log;
use crate::surface::{FileStateSlot, Frame, MemoryStateSlot, Origin, StateSlot, Surface};

/// Options for a single render.
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    pub state: Option<&'a Path>,
    pub select: Option<usize>,
    pub timeout: Duration,
}

pub fn render_document(path: &Path, options: RenderOptions<'_>, config: &BridgeConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let frame = rt.block_on(render(path, options, config))?;
    print!("{}", format_frame(&frame));
    Ok(())
}

/// Render `path` and return the first frame built from the host's snapshot
/// with every image settled, or the latest one when `timeout` runs out.
pub async fn render(
    path: &Path,
    options: RenderOptions<'_>,
    config: &BridgeConfig,
) -> Result<Arc<Frame>> {
    let workspace = Workspace::new();
    let document = Arc::new(
        FileDocument::open(path, workspace.clone())
            .with_context(|| format!("Failed to open document `{}`", path.display()))?,
    );
    let resources = Arc::new(FsResources::new(document.dir()));

    let (host, surface_end) = bridge_pair();
    let bridge = SyncBridge::new(
        document,
        resources,
        workspace.subscribe(),
        host,
        config.sync_options(),
    );
    let bridge = tokio::spawn(bridge.run());

    let slot: Arc<dyn StateSlot> = match options.state {
        Some(state) => Arc::new(FileStateSlot::new(state)),
        None => Arc::new(MemoryStateSlot::new()),
    };
    let surface = Surface::new(surface_end, slot);
    if options.select.is_some() {
        surface.handle().select_cell(options.select);
    }
    let view = surface.view();
    let surface = tokio::spawn(surface.run());

    let (frames_tx, mut frames) = watch::channel(None);
    tokio::spawn(view.run(frames_tx));

    let settled = tokio::time::timeout(
        options.timeout,
        frames.wait_for(|frame| {
            frame
                .as_deref()
                .is_some_and(|f| f.origin() == Origin::Host && f.is_complete())
        }),
    )
    .await;
    if settled.is_err() {
        log!("render"; "gave up waiting after {:?}, some images are still loading", options.timeout);
    }
    drop(settled);
    let frame = frames.borrow().clone();

    bridge.abort();
    surface.abort();
    frame.context("no snapshot arrived from the host")
}

/// Plain-text listing of a frame, one line per cell.
pub fn format_frame(frame: &Frame) -> String {
    let mut out = String::new();
    match frame {
        Frame::Invalid { message, .. } => {
            out.push_str(&format!("{}\n", message.red()));
        }
        Frame::Tiles {
            cells, selected, ..
        } => {
            if cells.is_empty() {
                out.push_str(&format!("{}\n", "(no cells)".dimmed()));
            }
            for cell in cells {
                let marker = if *selected == Some(cell.index) { "*" } else { " " };
                out.push_str(&format!("{marker}[{}] {}", cell.index, cell.text.as_deref().unwrap_or("")));
                if let Some(href) = &cell.href {
                    out.push_str(&format!("  {}", describe_image(href, cell.image.as_ref())));
                }
                out.push('\n');
            }
        }
    }
    out
}

fn describe_image(href: &str, image: Option<&crate::surface::LoadResult>) -> String {
    match image {
        None => format!("<{href}: loading>"),
        Some(Err(e)) => format!("<{href}: {e}>"),
        Some(Ok(resource)) => match resource.dimensions {
            Some((w, h)) => format!("<{href}: {}, {w}x{h}, {} bytes>", resource.mime, resource.len()),
            None => format!("<{href}: {}, {} bytes>", resource.mime, resource.len()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payload::tiny_png;
    use tempfile::TempDir;

    fn options(state: Option<&Path>) -> RenderOptions<'_> {
        RenderOptions {
            state,
            select: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_file_with_relative_image() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat.png"), tiny_png(4, 2)).unwrap();
        let document = dir.path().join("board.json");
        std::fs::write(
            &document,
            r#"{"scratches":[{"text":"cat","href":"cat.png"},{"text":"note"}]}"#,
        )
        .unwrap();

        let frame = render(&document, options(None), &BridgeConfig::default())
            .await
            .unwrap();
        assert_eq!(frame.origin(), Origin::Host);

        let text = format_frame(&frame);
        assert!(text.contains("[0] cat  <cat.png: image/png, 4x2"), "{text}");
        assert!(text.contains("[1] note"), "{text}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_invalid_document() {
        let dir = TempDir::new().unwrap();
        let document = dir.path().join("board.json");
        std::fs::write(&document, "{ nope").unwrap();

        let frame = render(&document, options(None), &BridgeConfig::default())
            .await
            .unwrap();
        assert!(matches!(&*frame, Frame::Invalid { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_writes_state_slot() {
        let dir = TempDir::new().unwrap();
        let document = dir.path().join("board.json");
        std::fs::write(&document, r#"{"scratches":[]}"#).unwrap();
        let state = dir.path().join("state.json");

        render(&document, options(Some(&state)), &BridgeConfig::default())
            .await
            .unwrap();

        let saved = FileStateSlot::new(&state).load().unwrap();
        assert_eq!(saved.snapshot.unwrap().text, r#"{"scratches":[]}"#);
    }
}
