//! Memoizing resource cache.
//!
//! Two tables keyed by resource identifier:
//!
//! ```text
//! in_flight: uri -> Shared<load>     strong, only while the request is pending
//! resolved:  uri -> Weak<Resource>   lives exactly as long as some holder
//! ```
//!
//! Callers asking for an identifier that is loading join the same request.
//! Once loaded, the value is reused for as long as any caller still holds
//! the `Arc`; after the last holder drops it the next lookup asks the host
//! again. Failed loads are never remembered.
//!
//! Every load is driven by its own task, which settles the tables before
//! handing the result to callers. A response therefore leaves `in_flight`
//! even when all callers have given up on it, and once settled the cache
//! holds nothing but the `Weak`.

use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Either, Ready, Shared, ready};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

use super::loader::{LoadError, LoadResult, ResourceLoader};
use crate::protocol::Resource;

type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Future returned by [`ResourceCache::get`].
pub type CachedLoad = Either<Ready<LoadResult>, SharedLoad>;

/// Lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Served from a live resolved value
    pub hits: u64,
    /// Joined a request already in flight
    pub joins: u64,
    /// Started a new host request
    pub requests: u64,
}

struct InFlight {
    /// Distinguishes this load from a later one for the same identifier
    ticket: u64,
    load: SharedLoad,
}

#[derive(Default)]
struct Tables {
    in_flight: FxHashMap<String, InFlight>,
    resolved: FxHashMap<String, Weak<Resource>>,
    next_ticket: u64,
    stats: CacheStats,
}

impl Tables {
    /// Move a finished load out of the in-flight table.
    fn settle(&mut self, uri: &str, ticket: u64, result: &LoadResult) {
        let current = self.in_flight.get(uri).is_some_and(|entry| entry.ticket == ticket);
        if !current {
            return;
        }
        self.in_flight.remove(uri);
        self.purge();
        match result {
            Ok(resource) => {
                self.resolved.insert(uri.to_string(), Arc::downgrade(resource));
            }
            Err(e) => crate::debug!("cache"; "{} not cached: {}", uri, e),
        }
    }

    /// Drop resolved entries whose value nobody holds anymore.
    fn purge(&mut self) -> usize {
        let before = self.resolved.len();
        self.resolved.retain(|_, weak| weak.strong_count() > 0);
        before - self.resolved.len()
    }
}

/// Deduplicating, weakly-retaining front of a [`ResourceLoader`].
#[derive(Clone)]
pub struct ResourceCache {
    loader: ResourceLoader,
    tables: Arc<Mutex<Tables>>,
}

impl ResourceCache {
    pub fn new(loader: ResourceLoader) -> Self {
        Self {
            loader,
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    /// Resource for `uri`, reusing a live value or a pending request.
    ///
    /// Must be called within a Tokio runtime.
    pub fn get(&self, uri: &str) -> CachedLoad {
        let mut tables = self.tables.lock();

        if let Some(weak) = tables.resolved.get(uri) {
            match weak.upgrade() {
                Some(resource) => {
                    tables.stats.hits += 1;
                    return Either::Left(ready(Ok(resource)));
                }
                None => {
                    tables.resolved.remove(uri);
                }
            }
        }

        if let Some(entry) = tables.in_flight.get(uri) {
            let load = entry.load.clone();
            tables.stats.joins += 1;
            return Either::Right(load);
        }

        let ticket = tables.next_ticket;
        tables.next_ticket += 1;
        tables.stats.requests += 1;

        let request = self.loader.load(uri);
        let owner = Arc::downgrade(&self.tables);
        let key = uri.to_string();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = request.await;
            if let Some(tables) = owner.upgrade() {
                tables.lock().settle(&key, ticket, &result);
            }
            // Callers that gave up dropped the receiver along with the last `Shared`
            let _ = tx.send(result);
        });
        let load = async move { rx.await.unwrap_or(Err(LoadError::Abandoned)) }
            .boxed()
            .shared();

        tables.in_flight.insert(
            uri.to_string(),
            InFlight {
                ticket,
                load: load.clone(),
            },
        );
        Either::Right(load)
    }

    /// Live value for `uri` without starting a load.
    pub fn peek(&self, uri: &str) -> Option<Arc<Resource>> {
        self.tables.lock().resolved.get(uri).and_then(Weak::upgrade)
    }

    /// Whether a request for `uri` is waiting on the host.
    pub fn is_loading(&self, uri: &str) -> bool {
        self.tables.lock().in_flight.contains_key(uri)
    }

    /// Drop resolved entries whose value nobody holds anymore.
    pub fn purge(&self) -> usize {
        self.tables.lock().purge()
    }

    pub fn stats(&self) -> CacheStats {
        self.tables.lock().stats
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }
}
