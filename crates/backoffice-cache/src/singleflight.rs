//! Single-flight load coordination.
//!
//! Concurrent callers asking for the same key while a load is in flight
//! attach to that load instead of starting their own, and all of them
//! observe the same `Result`. The registry entry is removed when the load
//! finishes or panics, so the next caller after completion starts a fresh
//! load.
//!
//! There is no timeout here: a loader that never completes blocks every
//! waiter on its key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;

type SharedLoad<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

pub struct SingleFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    name: &'static str,
    inflight: Arc<Mutex<HashMap<String, SharedLoad<T, E>>>>,
}

impl<T: Clone, E: Clone> Clone for SingleFlight<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inflight: Arc::clone(&self.inflight),
        }
    }
}

/// Removes the registry entry when the load finishes or unwinds.
struct InflightGuard<T: Clone, E: Clone> {
    registry: Arc<Mutex<HashMap<String, SharedLoad<T, E>>>>,
    key: String,
}

impl<T: Clone, E: Clone> Drop for InflightGuard<T, E> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// `name` labels logs and metrics (usually the entity name).
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `loader` for `key`, or join the load already in flight for it.
    ///
    /// `loader` is only invoked by the caller that starts the load.
    pub async fn run<F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let load = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(existing) => {
                    tracing::debug!(flight = self.name, key = %key, "joining in-flight load");
                    crate::metrics::record_singleflight_shared(self.name);
                    existing.clone()
                }
                None => {
                    let fut = loader();
                    let guard = InflightGuard {
                        registry: Arc::clone(&self.inflight),
                        key: key.to_string(),
                    };
                    let load = async move {
                        let _guard = guard;
                        fut.await
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key.to_string(), load.clone());
                    load
                }
            }
        };
        load.await
    }

    /// Number of loads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }
}
