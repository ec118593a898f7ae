use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::images::ImageError;

type Flight<V> = Shared<BoxFuture<'static, Result<Arc<V>, ImageError>>>;

/// A memo map whose entries are futures rather than values.
///
/// The first caller for a key inserts a shared future while holding the lock,
/// so every later caller (concurrent or not) awaits that same computation.
/// Successful results stay forever. A failed future is dropped from the map
/// once it resolves, which lets the next caller start over.
pub struct FlightMap<K, V> {
    entries: Mutex<HashMap<K, Flight<V>>>,
}

impl<K, V> FlightMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value for `key`, running `init` only if nothing is cached
    /// or in flight.
    ///
    /// `init` is spawned on the tokio runtime, so once started it runs to
    /// completion even if every caller stops waiting.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, init: F) -> Result<Arc<V>, ImageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ImageError>> + Send + 'static,
    {
        let flight = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(flight) => flight.clone(),
                None => {
                    let task = tokio::spawn(init());
                    let flight = async move {
                        match task.await {
                            Ok(result) => result.map(Arc::new),
                            Err(e) => Err(ImageError::render("task", e)),
                        }
                    }
                    .boxed()
                    .shared();
                    entries.insert(key.clone(), flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        if result.is_err() {
            let mut entries = self.entries.lock();
            // A newer attempt may already have replaced the failed one.
            if entries.get(&key).is_some_and(|current| current.ptr_eq(&flight)) {
                entries.remove(&key);
                log::warn!("Dropped failed cache entry so it can be retried");
            }
        }

        result
    }

    /// Number of entries, completed or in flight.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl<K, V> Default for FlightMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
