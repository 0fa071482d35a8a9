//! WebSocket transport for remote render surfaces.
//!
//! Each accepted connection becomes a [`HostEndpoint`]. A pump thread owns
//! the socket and moves messages between the socket and the in-process
//! channel:
//!
//! ```text
//! browser --text frame--> pump --SurfaceMessage--> HostEndpoint.inbox
//! browser <--text frame-- pump <--HostMessage----- HostEndpoint.outbox
//! ```
//!
//! Frames that do not parse as a [`SurfaceMessage`] are logged and dropped.

use std::io::ErrorKind;
use std::net::{IpAddr, TcpListener, TcpStream};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{HostEndpoint, SurfaceEndpoint, bridge_pair};
use crate::protocol::SurfaceMessage;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// How long the pump blocks on a read before flushing outbound messages
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bind the listener, retrying with incremented ports if in use.
///
/// Returns the listener and the port actually bound.
pub fn bind(interface: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind WebSocket server after {} attempts: {}",
        MAX_PORT_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Accept connections on `listener`, handing each new surface's host
/// endpoint to `conn_tx`.
///
/// The acceptor stops when `conn_tx` is closed.
pub fn start_ws_server(listener: TcpListener, conn_tx: mpsc::UnboundedSender<HostEndpoint>) {
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    crate::log!("ws"; "accept error: {}", e);
                    continue;
                }
            };
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".into());

            let ws = match tungstenite::accept(stream) {
                Ok(ws) => ws,
                Err(e) => {
                    crate::log!("ws"; "handshake with {} failed: {}", peer, e);
                    continue;
                }
            };
            crate::debug!("ws"; "surface connected: {}", peer);

            let (host, surface) = bridge_pair();
            if conn_tx.send(host).is_err() {
                crate::debug!("ws"; "no bridge listening, stopping acceptor");
                break;
            }
            std::thread::spawn(move || pump(ws, surface, &peer));
        }
    });
}

/// Move messages between one socket and the surface end of its channel.
fn pump(mut ws: WebSocket<TcpStream>, mut surface: SurfaceEndpoint, peer: &str) {
    if let Err(e) = ws.get_ref().set_read_timeout(Some(POLL_INTERVAL)) {
        crate::log!("ws"; "cannot configure socket for {}: {}", peer, e);
        return;
    }

    loop {
        // Outbound first so host updates are not starved by a chatty client
        loop {
            match surface.inbox.try_recv() {
                Ok(Some(message)) => {
                    let json = match message.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            crate::log!("ws"; "cannot encode {}: {}", message.kind(), e);
                            continue;
                        }
                    };
                    if let Err(e) = ws.send(Message::Text(json.into())) {
                        crate::debug!("ws"; "surface {} disconnected: {}", peer, e);
                        return;
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    // Bridge dropped its endpoint (replaced by a newer surface)
                    let _ = ws.close(None);
                    let _ = ws.flush();
                    return;
                }
            }
        }

        match ws.read() {
            Ok(Message::Text(text)) => match SurfaceMessage::from_json(&text) {
                Ok(message) => {
                    if surface.outbox.send(message).is_err() {
                        let _ = ws.close(None);
                        return;
                    }
                }
                Err(e) => crate::log!("anomaly"; "malformed frame from {}: {}", peer, e),
            },
            Ok(Message::Close(_)) => {
                crate::debug!("ws"; "surface {} closed the connection", peer);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                crate::debug!("ws"; "surface {} disconnected: {}", peer, e);
                return;
            }
        }
    }
}
