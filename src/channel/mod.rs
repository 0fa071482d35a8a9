//! Message Channel
//!
//! Duplex, ordered, fire-and-forget transport between the host and the
//! render surface:
//!
//! ```text
//! Host --HostMessage-->  [Outbox | Inbox]  --> Surface
//! Host <--SurfaceMessage-- [Inbox | Outbox] <-- Surface
//! ```
//!
//! `send` never blocks and never waits for the peer. Messages are delivered
//! once each, in send order per direction; there is no ordering between the
//! two directions, no acknowledgement and no redelivery.
//!
//! - `ws` - carries the surface end over a WebSocket (JSON text frames)

pub mod ws;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::{HostMessage, SurfaceMessage};

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("peer endpoint is closed")]
    Closed,
}

/// Sending half of an endpoint. Cheap to clone.
#[derive(Debug)]
pub struct Outbox<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Outbox<T> {
    /// Enqueue a message for the peer.
    pub fn send(&self, message: T) -> Result<(), ChannelError> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of an endpoint.
#[derive(Debug)]
pub struct Inbox<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Inbox<T> {
    /// Next message from the peer, `None` once the peer is gone and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking receive for transport threads.
    pub fn try_recv(&mut self) -> Result<Option<T>, ChannelError> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }
}

/// One side of a duplex channel: sends `Out`, receives `In`.
#[derive(Debug)]
pub struct Endpoint<Out, In> {
    pub outbox: Outbox<Out>,
    pub inbox: Inbox<In>,
}

impl<Out, In> Endpoint<Out, In> {
    pub fn split(self) -> (Outbox<Out>, Inbox<In>) {
        (self.outbox, self.inbox)
    }
}

/// Host side: sends to the surface, receives from it.
pub type HostEndpoint = Endpoint<HostMessage, SurfaceMessage>;

/// Surface side: sends to the host, receives from it.
pub type SurfaceEndpoint = Endpoint<SurfaceMessage, HostMessage>;

/// Create a connected pair of endpoints.
pub fn duplex<A, B>() -> (Endpoint<A, B>, Endpoint<B, A>) {
    let (a_tx, a_rx) = mpsc::unbounded_channel::<A>();
    let (b_tx, b_rx) = mpsc::unbounded_channel::<B>();
    (
        Endpoint {
            outbox: Outbox { tx: a_tx },
            inbox: Inbox { rx: b_rx },
        },
        Endpoint {
            outbox: Outbox { tx: b_tx },
            inbox: Inbox { rx: a_rx },
        },
    )
}

/// Connected host/surface endpoint pair for in-process use.
pub fn bridge_pair() -> (HostEndpoint, SurfaceEndpoint) {
    duplex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let (left, right) = duplex::<u32, &'static str>();
        let (left_out, _left_in) = left.split();
        let (_right_out, mut right_in) = right.split();

        for n in 0..5 {
            left_out.send(n).unwrap();
        }
        for n in 0..5 {
            assert_eq!(right_in.recv().await, Some(n));
        }
    }

    #[tokio::test]
    async fn test_directions_are_independent() {
        let (host, surface) = bridge_pair();
        host.outbox
            .send(HostMessage::load_image_response("a".into(), "data:,x"))
            .unwrap();
        surface
            .outbox
            .send(SurfaceMessage::LoadImage {
                id: RequestId::from("b"),
                uri: "img://x".into(),
            })
            .unwrap();

        let (_, mut host_in) = host.split();
        let (_, mut surface_in) = surface.split();
        assert_eq!(host_in.recv().await.map(|m| m.kind()), Some("loadImage"));
        assert_eq!(
            surface_in.recv().await.map(|m| m.kind()),
            Some("loadImageResponse")
        );
    }

    #[test]
    fn test_send_after_peer_dropped() {
        let (left, right) = duplex::<u8, u8>();
        drop(right);
        assert!(left.outbox.is_closed());
        assert_eq!(left.outbox.send(1), Err(ChannelError::Closed));
    }

    #[test]
    fn test_try_recv_states() {
        let (left, right) = duplex::<u8, u8>();
        let (_, mut inbox) = right.split();
        assert_eq!(inbox.try_recv(), Ok(None));
        left.outbox.send(7).unwrap();
        assert_eq!(inbox.try_recv(), Ok(Some(7)));
        drop(left);
        assert_eq!(inbox.try_recv(), Err(ChannelError::Closed));
    }
}
