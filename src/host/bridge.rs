//! Document Sync Bridge - host half of the protocol.
//!
//! This actor is responsible for:
//! - Pushing the full document to the surface on attach and on every change
//! - Writing surface edits back verbatim as one full-document replacement
//! - Answering `loadImage` requests with inline data URIs
//!
//! # Architecture
//!
//! ```text
//! Workspace --[locator]--> SyncBridge --[update/loadImageResponse]--> surface
//!                             ^                                        |
//!                             +-------------[update/loadImage]---------+
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use super::HostError;
use super::document::DocumentStore;
use super::resource::ResourceReader;
use crate::channel::{HostEndpoint, Inbox, Outbox};
use crate::protocol::{
    DocumentSnapshot, HostMessage, Locator, RequestId, SurfaceMessage, encode_data_uri,
};

/// Bridge behavior knobs (from `[sync]` and `[resources]`).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pretty-print indent for written documents, 0 writes compact JSON
    pub indent: usize,
    /// MIME type for resources whose type cannot be guessed
    pub fallback_mime: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            fallback_mime: crate::utils::mime::types::PNG.to_string(),
        }
    }
}

/// Host side of one document ↔ surface session.
pub struct SyncBridge {
    document: Arc<dyn DocumentStore>,
    resources: Arc<dyn ResourceReader>,
    changes: Option<broadcast::Receiver<Locator>>,
    outbox: Outbox<HostMessage>,
    inbox: Inbox<SurfaceMessage>,
    options: SyncOptions,
    /// Text of the last `update` sent, to skip echoes of unchanged content
    last_sent: Option<String>,
}

impl SyncBridge {
    pub fn new(
        document: Arc<dyn DocumentStore>,
        resources: Arc<dyn ResourceReader>,
        changes: broadcast::Receiver<Locator>,
        endpoint: HostEndpoint,
        options: SyncOptions,
    ) -> Self {
        let (outbox, inbox) = endpoint.split();
        Self {
            document,
            resources,
            changes: Some(changes),
            outbox,
            inbox,
            options,
            last_sent: None,
        }
    }

    /// Run the bridge until the surface goes away.
    pub async fn run(mut self) {
        crate::debug!("host"; "attached to {}", self.document.locator());
        // The surface gets a snapshot immediately instead of waiting for an edit
        self.push_snapshot();

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },
                change = next_change(&mut self.changes) => self.handle_change(change),
            }
        }

        crate::debug!("host"; "surface detached from {}", self.document.locator());
    }

    fn handle_message(&mut self, message: SurfaceMessage) {
        match message {
            SurfaceMessage::Update { map } => self.write_back(&map),
            SurfaceMessage::LoadImage { id, uri } => self.load_image(id, uri),
        }
    }

    fn handle_change(&mut self, change: Result<Locator, RecvError>) {
        match change {
            Ok(locator) if &locator == self.document.locator() => self.push_snapshot(),
            Ok(_) => {}
            // Missed notifications may include ours; resync to be safe
            Err(RecvError::Lagged(skipped)) => {
                crate::debug!("host"; "missed {} change notifications, resyncing", skipped);
                self.push_snapshot();
            }
            Err(RecvError::Closed) => {
                crate::debug!("host"; "change source closed");
                self.changes = None;
            }
        }
    }

    /// Send the current document as a fresh snapshot.
    fn push_snapshot(&mut self) {
        let text = match self.document.text() {
            Ok(text) => text,
            Err(e) => {
                crate::log!("error"; "cannot read {}: {}", self.document.locator(), e);
                return;
            }
        };
        if self.last_sent.as_deref() == Some(text.as_str()) {
            return;
        }

        let snapshot = DocumentSnapshot::new(self.document.locator().clone(), text.clone());
        if self.outbox.send(HostMessage::update(snapshot)).is_ok() {
            crate::debug!("host"; "update sent ({} bytes)", text.len());
            self.last_sent = Some(text);
        }
    }

    /// Replace the whole document with the surface's edit, unvalidated.
    fn write_back(&mut self, map: &serde_json::Value) {
        let result = serialize_document(map, self.options.indent)
            .and_then(|text| self.document.replace_all(&text));
        match result {
            Ok(()) => crate::debug!("host"; "wrote surface edit to {}", self.document.locator()),
            Err(e) => crate::log!("error"; "write-back to {} failed: {}", self.document.locator(), e),
        }
    }

    /// Read and encode the resource off the event loop; reply when done.
    fn load_image(&self, id: RequestId, uri: String) {
        let resources = Arc::clone(&self.resources);
        let outbox = self.outbox.clone();
        let fallback_mime = self.options.fallback_mime.clone();

        tokio::task::spawn_blocking(move || {
            let bytes = match resources.read(&uri) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // No error reply exists in the protocol; the request stays pending
                    crate::log!("error"; "loadImage {} ({}) failed: {}", id, uri, e);
                    return;
                }
            };
            let mime = resources.mime_for(&uri).unwrap_or(fallback_mime.as_str());
            let text = encode_data_uri(mime, &bytes);
            if outbox.send(HostMessage::load_image_response(id, text)).is_err() {
                crate::debug!("host"; "surface gone before {} loaded", uri);
            }
        });
    }
}

/// Wait for the next change notification, forever once the source closed.
async fn next_change(
    changes: &mut Option<broadcast::Receiver<Locator>>,
) -> Result<Locator, RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Serialize a surface edit exactly as it will be written.
///
/// `indent == 0` produces compact JSON.
pub fn serialize_document(map: &serde_json::Value, indent: usize) -> Result<String, HostError> {
    if indent == 0 {
        return Ok(serde_json::to_string(map)?);
    }

    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    map.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
