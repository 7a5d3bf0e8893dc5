//! At most one in-flight operation per key.
//!
//! Concurrent callers asking for the same key await one shared future and
//! all observe its value. The future deregisters its key before yielding, so
//! the next call after it settles starts a fresh operation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Request de-duplicator keyed by string.
pub struct SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pending: Arc<Mutex<HashMap<String, Flight<T>>>>,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self { pending: Arc::new(Mutex::new(HashMap::new())) }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` for `key`, or join the flight already running for it.
    ///
    /// `operation` is only invoked when no flight is pending for `key`.
    pub async fn run<F, Fut>(&self, key: &str, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut pending = self.pending.lock().await;
            match pending.get(key) {
                Some(existing) => {
                    tracing::debug!(key, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    let flight = self.launch(key.to_string(), operation());
                    pending.insert(key.to_string(), flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Number of keys with an operation in flight.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn launch<Fut>(&self, key: String, operation: Fut) -> Flight<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let registry = Arc::clone(&self.pending);
        async move {
            let value = operation.await;
            registry.lock().await.remove(&key);
            value
        }
        .boxed()
        .shared()
    }
}
