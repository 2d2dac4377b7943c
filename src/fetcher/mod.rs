//! Read-through fetcher.
//!
//! Looks a request up in the store and only goes upstream on a miss.
//! Successful responses are stored; failures never are.
//!
//! Concurrent misses for the same key share one upstream call unless
//! single-flight is disabled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info};

use crate::cache::{CacheKey, ExpiringStore};
use crate::market::MarketRequest;
use crate::upstream::{FetchError, FetchResult, Upstream};

type Flight = Shared<BoxFuture<'static, FetchResult>>;

/// A running upstream call, tagged with the generation that registered it.
#[derive(Clone)]
struct InFlight {
    generation: u64,
    flight: Flight,
}

/// Leaves the in-flight map when the fetch task ends, including by panic.
struct FlightGuard {
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
    key: CacheKey,
    generation: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.in_flight
            .remove_if(&self.key, |_, entry| entry.generation == generation);
    }
}

/// Read-through coordinator between the HTTP layer, the store and the upstream.
#[derive(Clone)]
pub struct Fetcher {
    store: ExpiringStore,
    upstream: Arc<dyn Upstream>,
    /// Upstream calls currently running, by key.
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
    next_generation: Arc<AtomicU64>,
    single_flight: bool,
}

impl Fetcher {
    pub fn new(store: ExpiringStore, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            store,
            upstream,
            in_flight: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(0)),
            single_flight: true,
        }
    }

    /// Enable or disable coalescing of concurrent identical misses.
    #[must_use]
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn store(&self) -> &ExpiringStore {
        &self.store
    }

    /// Serve `request` from the store, or fetch it upstream and store it.
    pub async fn fetch(&self, request: &MarketRequest) -> FetchResult {
        let key = CacheKey::build(request);

        if let Some(value) = self.store.get(&key) {
            debug!("Serving cached response: {}", key);
            return Ok(value);
        }

        debug!("Cache miss: {}", key);

        if !self.single_flight {
            return fetch_and_store(
                Arc::clone(&self.upstream),
                self.store.clone(),
                key,
                request.clone(),
            )
            .await;
        }

        self.join_or_start(key, request).await
    }

    /// Attach to the running call for `key`, or start one.
    ///
    /// The call runs on its own task, so a caller going away never cancels
    /// it for the others. The task stores the result before it leaves the
    /// in-flight map; only that flight's own entry is ever removed.
    fn join_or_start(&self, key: CacheKey, request: &MarketRequest) -> Flight {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight request: {}", key);
                entry.get().flight.clone()
            }
            Entry::Vacant(entry) => {
                let upstream = Arc::clone(&self.upstream);
                let store = self.store.clone();
                let in_flight = Arc::clone(&self.in_flight);
                let request = request.clone();
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

                let handle = tokio::spawn(async move {
                    let _guard = FlightGuard {
                        in_flight,
                        key: key.clone(),
                        generation,
                    };
                    fetch_and_store(upstream, store, key, request).await
                });

                let flight = async move {
                    handle
                        .await
                        .unwrap_or_else(|e| Err(FetchError::network(format!("Fetch task failed: {e}"))))
                }
                .boxed()
                .shared();

                entry.insert(InFlight {
                    generation,
                    flight: flight.clone(),
                });
                flight
            }
        }
    }
}

/// One upstream round trip, storing the value on success.
async fn fetch_and_store(
    upstream: Arc<dyn Upstream>,
    store: ExpiringStore,
    key: CacheKey,
    request: MarketRequest,
) -> FetchResult {
    // Another flight may have landed between the caller's lookup and now.
    if let Some(value) = store.get(&key) {
        return Ok(value);
    }

    match upstream.call(&request.path, &request.params).await {
        Ok(value) => {
            store.set(key, value.clone());
            Ok(value)
        }
        Err(e) => {
            info!(
                "Upstream {} failed for {} ({}): {}",
                request.operation,
                request.path,
                e.status_hint(),
                e
            );
            Err(e)
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("store", &self.store)
            .field("in_flight", &self.in_flight.len())
            .field("single_flight", &self.single_flight)
            .finish()
    }
}
