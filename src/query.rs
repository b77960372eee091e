//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query. [`ApiQuery`] describes a cached GET (key,
//! endpoint, selector, enabled flag) and runs it once through the shared
//! [`QueryClient`]. [`Query`] is the handle a view keeps: it runs the fetch in
//! the background, exposes `data`/`is_loading`/`error`, and refetches on its
//! own when an invalidation covers its key.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::from_api(notifications.list_query(None));
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! if query.is_loading() {
//!     render_spinner();
//! } else if let Some(list) = query.data() {
//!     render_list(list);
//! }
//! ```

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::api::client::{ApiClient, RequestOptions};
use crate::cache::{CacheSource, QueryClient, QueryKey};
use crate::error::ApiError;

/// Outcome of one query run.
///
/// `data` and `error` can both be set: a failed refetch keeps the previous
/// data visible.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
  pub data: Option<T>,
  pub error: Option<ApiError>,
  /// Where `data` came from; `None` when nothing ran
  pub source: Option<CacheSource>,
}

impl<T> QueryResult<T> {
  /// Result of a disabled query.
  pub fn idle() -> Self {
    Self {
      data: None,
      error: None,
      source: None,
    }
  }

  pub fn failed(error: ApiError) -> Self {
    Self {
      data: None,
      error: Some(error),
      source: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.data.is_some() && self.error.is_none()
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }
}

type Selector<T> = Arc<dyn Fn(&Value) -> Result<T, ApiError> + Send + Sync>;

/// A cached GET request.
pub struct ApiQuery<T> {
  api: ApiClient,
  client: QueryClient,
  key: QueryKey,
  endpoint: String,
  enabled: bool,
  select: Selector<T>,
}

impl<T> Clone for ApiQuery<T> {
  fn clone(&self) -> Self {
    Self {
      api: self.api.clone(),
      client: self.client.clone(),
      key: self.key.clone(),
      endpoint: self.endpoint.clone(),
      enabled: self.enabled,
      select: Arc::clone(&self.select),
    }
  }
}

impl ApiQuery<Value> {
  /// Query returning the raw JSON body.
  pub fn new(api: ApiClient, client: QueryClient, key: QueryKey, endpoint: impl Into<String>) -> Self {
    Self {
      api,
      client,
      key,
      endpoint: endpoint.into(),
      enabled: true,
      select: Arc::new(|body: &Value| Ok(body.clone())),
    }
  }
}

impl<T> ApiQuery<T> {
  /// Transform the cached body into `U` on every read.
  pub fn select<U>(self, select: impl Fn(&Value) -> Result<U, ApiError> + Send + Sync + 'static) -> ApiQuery<U> {
    ApiQuery {
      api: self.api,
      client: self.client,
      key: self.key,
      endpoint: self.endpoint,
      enabled: self.enabled,
      select: Arc::new(select),
    }
  }

  /// Disabled queries never touch the network.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  pub fn client(&self) -> &QueryClient {
    &self.client
  }

  /// Read through the cache, fetching when missing, stale or invalidated.
  pub async fn run(&self) -> QueryResult<T> {
    self.execute(false).await
  }

  /// Go to the network even when the cached entry is fresh.
  pub async fn refetch(&self) -> QueryResult<T> {
    self.execute(true).await
  }

  async fn execute(&self, force: bool) -> QueryResult<T> {
    if !self.enabled {
      return QueryResult::idle();
    }

    let api = self.api.clone();
    let endpoint = self.endpoint.clone();
    let fetcher = move || {
      let api = api.clone();
      let endpoint = endpoint.clone();
      async move { api.request::<Value>(&endpoint, RequestOptions::default()).await }
    };
    let fetched = if force {
      self.client.refetch(&self.key, fetcher).await
    } else {
      self.client.fetch(&self.key, fetcher).await
    };

    match fetched {
      Ok(result) => match (self.select)(&result.data) {
        Ok(data) => QueryResult {
          data: Some(data),
          error: result.error,
          source: Some(result.source),
        },
        Err(err) => QueryResult::failed(err),
      },
      Err(err) => QueryResult::failed(err),
    }
  }
}

/// A boxed future that resolves to a query result
type BoxFuture<T> = Pin<Box<dyn Future<Output = QueryResult<T>> + Send>>;

/// A factory function that creates futures for fetching data. The flag asks
/// for a forced fetch that skips any fresh cache entry.
type FetcherFn<T> = Box<dyn Fn(bool) -> BoxFuture<T> + Send + Sync>;

/// Background query handle with loading/data/error state.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/data/error state, keeping old data through failed refetches
/// - Async result handling via channels
/// - Refetch when an invalidation covering its key is broadcast
pub struct Query<T> {
  data: Option<T>,
  error: Option<ApiError>,
  is_loading: bool,
  enabled: bool,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<QueryResult<T>>>,
  key: Option<QueryKey>,
  invalidations: Option<broadcast::Receiver<QueryKey>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = QueryResult<T>> + Send + 'static,
  {
    Self::with_fetcher(Box::new(move |_: bool| -> BoxFuture<T> { Box::pin(fetcher()) }))
  }

  fn with_fetcher(fetcher: FetcherFn<T>) -> Self {
    Self {
      data: None,
      error: None,
      is_loading: false,
      enabled: true,
      fetcher,
      receiver: None,
      key: None,
      invalidations: None,
    }
  }

  /// Create a query that runs `api` and follows invalidations of its key.
  pub fn from_api(api: ApiQuery<T>) -> Self {
    let key = api.key().clone();
    let invalidations = api.client().subscribe();
    let enabled = api.is_enabled();
    let api = Arc::new(api);

    let mut query = Self::with_fetcher(Box::new(move |force: bool| -> BoxFuture<T> {
      let api = Arc::clone(&api);
      Box::pin(async move {
        if force {
          api.refetch().await
        } else {
          api.run().await
        }
      })
    }));
    query.enabled = enabled;
    query.key = Some(key);
    query.invalidations = Some(invalidations);
    query
  }

  /// Get the data, if any fetch has succeeded.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.is_loading
  }

  /// Check if the last fetch succeeded.
  pub fn is_success(&self) -> bool {
    self.data.is_some() && self.error.is_none()
  }

  /// Check if the last fetch failed.
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  /// Get the error from the last fetch.
  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn key(&self) -> Option<&QueryKey> {
    self.key.as_ref()
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading or disabled.
  pub fn fetch(&mut self) {
    if self.is_loading || !self.enabled {
      return;
    }
    self.start_fetch(false);
  }

  /// Force a refetch, even if already loading or data exists. Queries built
  /// with [`from_api`](Self::from_api) bypass a fresh cache entry.
  pub fn refetch(&mut self) {
    self.restart(true);
  }

  /// Drop any pending fetch and start a new one.
  fn restart(&mut self, force: bool) {
    if !self.enabled {
      return;
    }
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch(force);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred, or an
  /// invalidation started a refetch). Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    // The entry is already invalidated, so a plain read goes to the network
    if self.take_invalidation() {
      self.restart(false);
      changed = true;
    }

    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return changed,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(result) => {
        if result.data.is_some() {
          self.data = result.data;
        }
        self.error = result.error;
        self.is_loading = false;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => changed,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.error = Some(ApiError::Network("Query was cancelled".to_string()));
        self.is_loading = false;
        self.receiver = None;
        true
      }
    }
  }

  /// Drain pending invalidations; true if any covers this query's key.
  fn take_invalidation(&mut self) -> bool {
    let (Some(key), Some(rx)) = (&self.key, &mut self.invalidations) else {
      return false;
    };

    let mut hit = false;
    loop {
      match rx.try_recv() {
        Ok(prefix) => hit |= key.starts_with(&prefix),
        // Missed messages might have covered us
        Err(broadcast::error::TryRecvError::Lagged(_)) => hit = true,
        Err(_) => break,
      }
    }
    hit
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, force: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.is_loading = true;

    let future = (self.fetcher)(force);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("data", &self.data)
      .field("error", &self.error)
      .field("is_loading", &self.is_loading)
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn ok<T>(data: T) -> QueryResult<T> {
    QueryResult {
      data: Some(data),
      error: None,
      source: Some(CacheSource::Network),
    }
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { ok(vec![1, 2, 3]) });

    assert!(!query.is_loading());
    assert!(query.data().is_none());

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> =
      Query::new(|| async { QueryResult::failed(ApiError::Network("Something went wrong".into())) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(
      query.error(),
      Some(&ApiError::Network("Something went wrong".into()))
    );
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_data() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new(move || {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          ok(42)
        } else {
          QueryResult::failed(ApiError::Network("offline".into()))
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(query.data(), Some(&42));
    assert!(query.is_error());
    assert!(!query.is_success());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ok(42)
      }
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ok(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch should have completed and been received
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_disabled_api_query_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/notifications")
      .expect(0)
      .create_async()
      .await;

    let api = ApiClient::with_base_url(&server.url()).unwrap();
    let client = QueryClient::new(MemoryStorage::new());
    let query = ApiQuery::new(api, client, QueryKey::new("notifications"), "/notifications").enabled(false);

    let result = query.run().await;
    assert!(result.data.is_none());
    assert!(result.source.is_none());

    let mut handle = Query::from_api(query);
    handle.fetch();
    assert!(!handle.is_loading());

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_select_transforms_body() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/users")
      .with_status(200)
      .with_body(r#"[{"id":"a"},{"id":"b"}]"#)
      .create_async()
      .await;

    let api = ApiClient::with_base_url(&server.url()).unwrap();
    let client = QueryClient::new(MemoryStorage::new());
    let query = ApiQuery::new(api, client, QueryKey::new("users"), "/users").select(|body| {
      body
        .as_array()
        .map(|a| a.len())
        .ok_or_else(|| ApiError::Parse("expected array".into()))
    });

    let result = query.run().await;
    assert_eq!(result.data, Some(2));
    assert_eq!(result.source, Some(CacheSource::Network));
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/notifications")
      .with_status(200)
      .with_body("[]")
      .expect(2)
      .create_async()
      .await;

    let api = ApiClient::with_base_url(&server.url()).unwrap();
    let client = QueryClient::new(MemoryStorage::new());
    let key = QueryKey::new("notifications").push("list");
    let mut query = Query::from_api(ApiQuery::new(api, client.clone(), key, "/notifications"));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&json!([])));

    // Unrelated domain: no refetch
    client.invalidate(&QueryKey::new("users"));
    assert!(!query.poll());

    client.invalidate(&QueryKey::new("notifications"));
    assert!(query.poll());
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert!(!query.is_loading());

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_refetch_ignores_fresh_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/notifications")
      .with_status(200)
      .with_body("[]")
      .expect(2)
      .create_async()
      .await;

    let api = ApiClient::with_base_url(&server.url()).unwrap();
    let client = QueryClient::new(MemoryStorage::new());
    let key = QueryKey::new("notifications").push("list");
    let mut query = Query::from_api(ApiQuery::new(api, client, key, "/notifications"));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&json!([])));

    query.refetch();
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(query.poll());
    assert!(query.is_success());

    mock.assert_async().await;
  }
}
