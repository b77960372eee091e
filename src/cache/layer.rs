//! Query client that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::key::QueryKey;
use super::storage::{CacheStorage, CachedEntry};
use super::traits::CacheResult;
use crate::error::ApiError;
use crate::retry::RetryPolicy;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// A fetch currently running for some key. `id` tells a finishing fetch
/// whether it is still the one registered for its key.
struct InFlight {
  id: u64,
  fetch: SharedFetch,
}

/// Defaults applied to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
  /// How long before cached data is considered stale
  pub stale_time: Duration,
  /// Retry policy for failed fetches
  pub retry: RetryPolicy,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::minutes(5),
      retry: RetryPolicy::default(),
    }
  }
}

/// Cache layer that manages caching logic and network fetching.
///
/// One `QueryClient` is created at startup and cloned into every hook; clones
/// share the same store, in-flight table and invalidation channel.
///
/// - Fresh entries are served without touching the network.
/// - Concurrent reads of the same key share a single fetch.
/// - Invalidating a key marks it and every key below it as stale and notifies
///   subscribers so live queries can refetch.
#[derive(Clone)]
pub struct QueryClient {
  storage: Arc<dyn CacheStorage>,
  in_flight: Arc<Mutex<HashMap<QueryKey, InFlight>>>,
  next_fetch_id: Arc<AtomicU64>,
  invalidations: broadcast::Sender<QueryKey>,
  options: QueryOptions,
}

impl QueryClient {
  /// Create a new query client with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    let (invalidations, _) = broadcast::channel(64);
    Self {
      storage: Arc::new(storage),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      next_fetch_id: Arc::new(AtomicU64::new(0)),
      invalidations,
      options: QueryOptions::default(),
    }
  }

  pub fn with_options(mut self, options: QueryOptions) -> Self {
    self.options = options;
    self
  }

  pub fn options(&self) -> &QueryOptions {
    &self.options
  }

  /// Check if cached data is stale based on cached_at timestamp.
  fn is_stale(&self, cached_at: DateTime<Utc>) -> bool {
    Utc::now() - cached_at > self.options.stale_time
  }

  fn in_flight(&self) -> MutexGuard<'_, HashMap<QueryKey, InFlight>> {
    lock(&self.in_flight)
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh, non-invalidated entry: return it
  /// 2. Otherwise join the running fetch for this key, or start one
  /// 3. On failure after retries, return the previous entry with the error
  ///    attached (offline mode); with nothing cached, return the error
  pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<Value>, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
  {
    self.fetch_with(key, fetcher, false).await
  }

  /// Like [`fetch`](Self::fetch) but skips the fresh-entry shortcut, so a
  /// request goes out unless one is already running for `key`.
  pub async fn refetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<Value>, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
  {
    self.fetch_with(key, fetcher, true).await
  }

  async fn fetch_with<F, Fut>(
    &self,
    key: &QueryKey,
    fetcher: F,
    force: bool,
  ) -> Result<CacheResult<Value>, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
  {
    let cached = self.storage.get(key);
    if let Some(entry) = cached.as_ref().filter(|_| !force) {
      if !entry.invalidated && !self.is_stale(entry.cached_at) {
        debug!(key = %key, "serving fresh cache entry");
        return Ok(CacheResult::from_cache(entry.data.clone(), entry.cached_at));
      }
    }

    match self.join_or_start(key, fetcher).await {
      Ok(data) => Ok(CacheResult::from_network(data)),
      Err(err) => match cached {
        Some(entry) => {
          warn!(key = %key, error = %err, "refetch failed, serving cached data");
          Ok(CacheResult::offline(entry.data, entry.cached_at, err))
        }
        None => Err(err),
      },
    }
  }

  fn join_or_start<F, Fut>(&self, key: &QueryKey, fetcher: F) -> SharedFetch
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
  {
    let mut in_flight = self.in_flight();
    if let Some(existing) = in_flight.get(key) {
      debug!(key = %key, "joining in-flight fetch");
      return existing.fetch.clone();
    }

    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
    let storage = Arc::clone(&self.storage);
    let registry = Arc::clone(&self.in_flight);
    let retry = self.options.retry;
    let owned_key = key.clone();

    let fetch = async move {
      debug!(key = %owned_key, "fetching");
      let result = retry.run(&fetcher, |_| true).await;

      // A fetch detached by an invalidation still answers its waiters but
      // never writes the store; a newer fetch owns the key now.
      let still_current = {
        let mut registry = lock(&registry);
        match registry.get(&owned_key) {
          Some(current) if current.id == id => {
            registry.remove(&owned_key);
            true
          }
          _ => false,
        }
      };

      match &result {
        Ok(data) if still_current => storage.store(
          &owned_key,
          CachedEntry {
            data: data.clone(),
            cached_at: Utc::now(),
            invalidated: false,
          },
        ),
        Ok(_) => debug!(key = %owned_key, "discarding result of detached fetch"),
        Err(_) => {}
      }
      result
    }
    .boxed()
    .shared();

    in_flight.insert(
      key.clone(),
      InFlight {
        id,
        fetch: fetch.clone(),
      },
    );
    fetch
  }

  /// Invalidate `prefix` and every key below it.
  ///
  /// Matching entries refetch on their next read, running fetches for them
  /// are detached, and subscribers are told about `prefix`.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let marked = self.storage.invalidate(prefix);
    self.in_flight().retain(|key, _| !key.starts_with(prefix));
    info!(key = %prefix, entries = marked, "invalidated queries");
    // No receivers is fine: nothing is listening yet.
    let _ = self.invalidations.send(prefix.clone());
    marked
  }

  /// Receive the prefix of every future invalidation.
  pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
    self.invalidations.subscribe()
  }

  /// Peek at the entry stored under exactly `key`.
  pub fn get_query_data(&self, key: &QueryKey) -> Option<CachedEntry> {
    self.storage.get(key)
  }

  /// Seed or overwrite the entry for `key` as fresh data.
  pub fn set_query_data(&self, key: &QueryKey, data: Value) {
    self.storage.store(
      key,
      CachedEntry {
        data,
        cached_at: Utc::now(),
        invalidated: false,
      },
    );
  }

  /// Drop every entry under `prefix`.
  pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
    self.storage.remove(prefix)
  }

  /// Whether a fetch is running for exactly `key`.
  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self.in_flight().contains_key(key)
  }
}

impl fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryClient")
      .field("entries", &self.storage.len())
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
