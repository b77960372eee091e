//! HTTP mutations: POST, PUT, PATCH and DELETE with cache invalidation.
//!
//! An [`ApiMutation`] is configured once (endpoint, method, keys to
//! invalidate, success callback) and then run per payload. On success the
//! configured keys are invalidated first and the callback runs second, so a
//! callback that reads the cache already sees the entries marked stale.
//!
//! # Example
//!
//! ```ignore
//! let delete = ApiMutation::<NotificationRef, IgnoredAny>::new(
//!     api,
//!     client,
//!     Endpoint::dynamic(|v: &NotificationRef| format!("/notifications/{}", v.id)),
//!     Method::DELETE,
//! )
//! .invalidates(NOTIFICATIONS.all());
//!
//! delete.mutate(NotificationRef::new("42")).await?;
//! ```

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::client::{ApiClient, RequestOptions};
use crate::cache::{QueryClient, QueryKey};
use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// Where a mutation sends its request.
pub enum Endpoint<V> {
  Static(String),
  /// Built from the payload, e.g. `/notifications/{id}`
  Dynamic(Arc<dyn Fn(&V) -> String + Send + Sync>),
}

impl<V> Endpoint<V> {
  pub fn dynamic(f: impl Fn(&V) -> String + Send + Sync + 'static) -> Self {
    Endpoint::Dynamic(Arc::new(f))
  }

  pub fn resolve(&self, variables: &V) -> String {
    match self {
      Endpoint::Static(path) => path.clone(),
      Endpoint::Dynamic(build) => build(variables),
    }
  }
}

impl<V> Clone for Endpoint<V> {
  fn clone(&self) -> Self {
    match self {
      Endpoint::Static(path) => Endpoint::Static(path.clone()),
      Endpoint::Dynamic(build) => Endpoint::Dynamic(Arc::clone(build)),
    }
  }
}

impl<V> From<&str> for Endpoint<V> {
  fn from(path: &str) -> Self {
    Endpoint::Static(path.to_string())
  }
}

type SuccessCallback<D> = Arc<dyn Fn(&D) + Send + Sync>;

/// A configured write operation.
pub struct ApiMutation<V, D> {
  api: ApiClient,
  client: QueryClient,
  endpoint: Endpoint<V>,
  method: Method,
  invalidate_keys: Vec<QueryKey>,
  on_success: Option<SuccessCallback<D>>,
  retry: RetryPolicy,
}

impl<V, D> Clone for ApiMutation<V, D> {
  fn clone(&self) -> Self {
    Self {
      api: self.api.clone(),
      client: self.client.clone(),
      endpoint: self.endpoint.clone(),
      method: self.method.clone(),
      invalidate_keys: self.invalidate_keys.clone(),
      on_success: self.on_success.clone(),
      retry: self.retry,
    }
  }
}

impl<V, D> ApiMutation<V, D>
where
  V: Serialize,
  D: DeserializeOwned,
{
  pub fn new(api: ApiClient, client: QueryClient, endpoint: impl Into<Endpoint<V>>, method: Method) -> Self {
    Self {
      api,
      client,
      endpoint: endpoint.into(),
      method,
      invalidate_keys: Vec::new(),
      on_success: None,
      retry: RetryPolicy::new(1, std::time::Duration::from_secs(1)),
    }
  }

  /// Invalidate `key` (and everything under it) after each success.
  pub fn invalidates(mut self, key: QueryKey) -> Self {
    self.invalidate_keys.push(key);
    self
  }

  /// Run `callback` with the response after invalidation.
  pub fn on_success(mut self, callback: impl Fn(&D) + Send + Sync + 'static) -> Self {
    self.on_success = Some(Arc::new(callback));
    self
  }

  /// Retry policy for transient failures.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Send `variables` as the JSON body and return the parsed response.
  pub async fn mutate(&self, variables: V) -> Result<D, ApiError> {
    let endpoint = self.endpoint.resolve(&variables);
    let options = RequestOptions::new(self.method.clone()).with_json_body(&variables)?;

    let result = self
      .retry
      .run(
        || self.api.request::<D>(&endpoint, options.clone()),
        ApiError::is_transient,
      )
      .await;

    let data = match result {
      Ok(data) => data,
      Err(err) => {
        warn!(method = %self.method, endpoint = %endpoint, error = %err, "mutation failed");
        return Err(err);
      }
    };

    debug!(method = %self.method, endpoint = %endpoint, "mutation succeeded");
    for key in &self.invalidate_keys {
      self.client.invalidate(key);
    }
    if let Some(callback) = &self.on_success {
      callback(&data);
    }
    Ok(data)
  }
}

impl<V, D> ApiMutation<V, D>
where
  V: Serialize + Send + Sync + 'static,
  D: DeserializeOwned + Send + 'static,
{
  /// Run the mutation on a background task; poll the returned handle.
  pub fn spawn(&self, variables: V) -> MutationTask<D> {
    let mutation = self.clone();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let result = mutation.mutate(variables).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
    MutationTask {
      state: MutationState::Loading,
      receiver: Some(rx),
    }
  }
}

/// The state of a mutation result.
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Mutation is idle (not yet started).
  Idle,
  /// Mutation is in progress.
  Loading,
  /// Mutation succeeded with a result.
  Success(T),
  /// Mutation failed with an error.
  Error(ApiError),
}

/// Handle to a mutation running in the background.
pub struct MutationTask<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T> Default for MutationTask<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<T> MutationTask<T> {
  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, MutationState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self.state, MutationState::Error(_))
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Returns `true` once, when the background mutation finishes.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => self.state = MutationState::Success(data),
      Ok(Err(err)) => self.state = MutationState::Error(err),
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error(ApiError::Network("Mutation was cancelled".to_string()));
      }
    }
    self.receiver = None;
    true
  }
}
