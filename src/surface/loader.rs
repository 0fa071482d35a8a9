//! Resource Loader - request/response correlation for `loadImage`.
//!
//! ```text
//! load(uri) --register id--> pending map --loadImage{id,uri}--> host
//! resolve(id, text) <--loadImageResponse{id,text}-------------- host
//! ```
//!
//! The pending map is owned by the loader instance, so independent surfaces
//! never share ids. A request whose response never arrives stays pending.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::channel::Outbox;
use crate::protocol::{PayloadError, RequestId, Resource, SurfaceMessage, decode_data_uri};

/// Why a load did not produce a resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("cannot decode resource payload: {0}")]
    Decode(#[from] PayloadError),

    #[error("host channel is closed")]
    ChannelClosed,

    #[error("loader dropped before the response arrived")]
    Abandoned,
}

pub type LoadResult = Result<Arc<Resource>, LoadError>;

/// Outcome of feeding a response to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Matching request resolved with a resource
    Resolved,
    /// Matching request rejected (payload did not decode)
    Rejected,
    /// No request with this id is pending
    Unknown,
}

type Resolver = oneshot::Sender<LoadResult>;

/// Issues `loadImage` requests and resolves them by correlation id.
#[derive(Clone)]
pub struct ResourceLoader {
    outbox: Outbox<SurfaceMessage>,
    pending: Arc<Mutex<FxHashMap<RequestId, Resolver>>>,
}

impl ResourceLoader {
    pub fn new(outbox: Outbox<SurfaceMessage>) -> Self {
        Self {
            outbox,
            pending: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Request `uri` from the host.
    ///
    /// The request is registered and sent before this returns; the returned
    /// future only waits for the response.
    pub fn load(&self, uri: &str) -> impl Future<Output = LoadResult> + Send + 'static {
        let id = RequestId::generate();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let message = SurfaceMessage::LoadImage {
            id: id.clone(),
            uri: uri.to_string(),
        };
        let sent = match self.outbox.send(message) {
            Ok(()) => {
                crate::debug!("loader"; "request {} for {}", id, uri);
                true
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                false
            }
        };

        async move {
            if !sent {
                return Err(LoadError::ChannelClosed);
            }
            rx.await.unwrap_or(Err(LoadError::Abandoned))
        }
    }

    /// Settle the request `id` with the inline payload `text`.
    ///
    /// Unknown or already-settled ids are logged and ignored.
    pub fn resolve(&self, id: &RequestId, text: &str) -> Resolution {
        let Some(resolver) = self.pending.lock().remove(id) else {
            crate::log!("anomaly"; "loadImageResponse for unknown request {}", id);
            return Resolution::Unknown;
        };

        let result = decode_data_uri(text).map(Arc::new).map_err(LoadError::from);
        let resolution = match &result {
            Ok(_) => Resolution::Resolved,
            Err(e) => {
                crate::debug!("loader"; "request {} rejected: {}", id, e);
                Resolution::Rejected
            }
        };
        // The caller may have been discarded; its result is simply dropped
        let _ = resolver.send(result);
        resolution
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Inbox, duplex};
    use crate::protocol::{HostMessage, encode_data_uri};
    use crate::utils::mime;

    fn loader() -> (ResourceLoader, Inbox<SurfaceMessage>) {
        let (surface, host) = duplex::<SurfaceMessage, HostMessage>();
        let (_, host_inbox) = host.split();
        (ResourceLoader::new(surface.outbox), host_inbox)
    }

    fn sent_request(inbox: &mut Inbox<SurfaceMessage>) -> (RequestId, String) {
        match inbox.try_recv() {
            Ok(Some(SurfaceMessage::LoadImage { id, uri })) => (id, uri),
            other => panic!("expected loadImage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_resolves_by_id() {
        let (loader, mut host) = loader();
        let pending = loader.load("img://x");

        let (id, uri) = sent_request(&mut host);
        assert_eq!(uri, "img://x");
        assert_eq!(loader.pending_count(), 1);

        let payload = encode_data_uri(mime::types::PNG, b"abc");
        assert_eq!(loader.resolve(&id, &payload), Resolution::Resolved);
        assert_eq!(loader.pending_count(), 0);

        let resource = pending.await.unwrap();
        assert_eq!(resource.bytes, b"abc");
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (loader, mut host) = loader();
        let first = loader.load("img://a");
        let second = loader.load("img://b");
        let (id_a, _) = sent_request(&mut host);
        let (id_b, _) = sent_request(&mut host);
        assert_ne!(id_a, id_b);

        loader.resolve(&id_b, &encode_data_uri("image/png", b"b"));
        loader.resolve(&id_a, &encode_data_uri("image/png", b"a"));

        assert_eq!(first.await.unwrap().bytes, b"a");
        assert_eq!(second.await.unwrap().bytes, b"b");
    }

    #[tokio::test]
    async fn test_unknown_and_consumed_ids_are_dropped() {
        let (loader, mut host) = loader();
        let pending = loader.load("img://x");
        let (id, _) = sent_request(&mut host);

        assert_eq!(
            loader.resolve(&RequestId::from("stale"), "data:,x"),
            Resolution::Unknown
        );
        assert_eq!(loader.pending_count(), 1);

        assert_eq!(loader.resolve(&id, "data:,x"), Resolution::Resolved);
        assert_eq!(loader.resolve(&id, "data:,y"), Resolution::Unknown);
        assert_eq!(pending.await.unwrap().bytes, b"x");
    }

    #[tokio::test]
    async fn test_decode_failure_rejects_only_its_caller() {
        let (loader, mut host) = loader();
        let bad = loader.load("img://bad");
        let good = loader.load("img://good");
        let (id_bad, _) = sent_request(&mut host);
        let (id_good, _) = sent_request(&mut host);

        assert_eq!(loader.resolve(&id_bad, "not a data uri"), Resolution::Rejected);
        assert_eq!(
            loader.resolve(&id_good, &encode_data_uri("image/png", b"ok")),
            Resolution::Resolved
        );

        assert_eq!(
            bad.await.unwrap_err(),
            LoadError::Decode(PayloadError::NotDataUri)
        );
        assert_eq!(good.await.unwrap().bytes, b"ok");
    }

    #[tokio::test]
    async fn test_closed_channel_fails_fast() {
        let (loader, host) = loader();
        drop(host);
        assert_eq!(loader.load("img://x").await, Err(LoadError::ChannelClosed));
        assert_eq!(loader.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_loaders_do_not_share_ids() {
        let (a, mut host_a) = loader();
        let (b, _host_b) = loader();
        let _pending = a.load("img://x");
        let (id, _) = sent_request(&mut host_a);

        assert_eq!(b.resolve(&id, "data:,x"), Resolution::Unknown);
        assert_eq!(a.pending_count(), 1);
    }
}
