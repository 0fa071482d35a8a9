//! `serve` command: host a document for one WebSocket surface at a time.
//!
//! ```text
//! FileDocument <-- DocumentWatcher (external edits)
//!      |
//! SyncBridge <==> ws pump <==> browser surface
//! ```
//!
//! A new connection replaces the current surface; the replaced bridge is
//! stopped, which closes its socket.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::{HostEndpoint, ws};
use crate::config::BridgeConfig;
use crate::host::{DocumentStore, DocumentWatcher, FileDocument, FsResources, SyncBridge, Workspace};
use crate::log;
use crate::logger::{status_error, status_success};

/// Run the bridge until Ctrl+C.
pub fn serve_document(document: &Path, config: &BridgeConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(document, config))
}

async fn run(path: &Path, config: &BridgeConfig) -> Result<()> {
    let workspace = Workspace::new();
    let document = Arc::new(
        FileDocument::open(path, workspace.clone())
            .with_context(|| format!("Failed to open document `{}`", path.display()))?,
    );
    // Without a watcher the bridge still works, external edits just go unseen
    let _watcher =
        match DocumentWatcher::start(document.path(), document.locator().clone(), workspace.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                status_error("not watching document for external edits", &e.to_string());
                None
            }
        };
    let resources = Arc::new(FsResources::new(document.dir()));

    let (listener, port) = ws::bind(config.serve.interface, config.serve.port)?;
    if port != config.serve.port {
        log!("serve"; "port {} in use, using {} instead", config.serve.port, port);
    }
    log!("serve"; "{} on ws://{}:{}", document.path().display(), config.serve.interface, port);

    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel::<HostEndpoint>();
    ws::start_ws_server(listener, conn_tx);

    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))?;

    let mut session: Option<JoinHandle<()>> = None;
    loop {
        tokio::select! {
            endpoint = conn_rx.recv() => {
                let Some(endpoint) = endpoint else { break };
                if let Some(previous) = session.take() {
                    previous.abort();
                    log!("serve"; "new surface replaces the previous one");
                }
                let bridge = SyncBridge::new(
                    document.clone(),
                    resources.clone(),
                    workspace.subscribe(),
                    endpoint,
                    config.sync_options(),
                );
                session = Some(tokio::spawn(bridge.run()));
                status_success("surface attached");
            }
            _ = shutdown_rx.recv() => {
                log!("serve"; "shutting down...");
                break;
            }
        }
    }

    if let Some(session) = session {
        session.abort();
    }
    Ok(())
}
