//! Notification queries and mutations.

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Serialize;

use super::api_types::{transform_notifications_response, NotificationList};
use super::client::ApiClient;
use super::query_keys::NOTIFICATIONS;
use super::types::{Notification, NotificationFilters, UpdateNotification};
use crate::cache::QueryClient;
use crate::error::ApiError;
use crate::mutation::{ApiMutation, Endpoint};
use crate::query::{ApiQuery, QueryResult};
use crate::retry::RetryPolicy;

/// Payload for `PUT /notifications/{id}`: the id picks the endpoint, the
/// patch is the body.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPatch {
  #[serde(skip_serializing)]
  pub id: String,
  #[serde(flatten)]
  pub update: UpdateNotification,
}

/// Payload for `DELETE /notifications/{id}`; sends no body.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRef {
  #[serde(skip_serializing)]
  pub id: String,
}

impl NotificationRef {
  pub fn new(id: impl Into<String>) -> Self {
    Self { id: id.into() }
  }
}

/// `/notifications` plus the filters as a query string, if any are set.
pub fn notifications_endpoint(filters: Option<&NotificationFilters>) -> String {
  let query = filters.map(|f| f.to_query_string()).unwrap_or_default();
  if query.is_empty() {
    "/notifications".to_string()
  } else {
    format!("/notifications?{}", query)
  }
}

/// Notification resource hooks.
#[derive(Clone, Debug)]
pub struct NotificationsApi {
  api: ApiClient,
  client: QueryClient,
  mutation_retry: RetryPolicy,
}

impl NotificationsApi {
  pub fn new(api: ApiClient, client: QueryClient) -> Self {
    Self {
      api,
      client,
      mutation_retry: RetryPolicy::new(1, std::time::Duration::from_secs(1)),
    }
  }

  pub fn with_mutation_retry(mut self, retry: RetryPolicy) -> Self {
    self.mutation_retry = retry;
    self
  }

  /// Cached list query, normalized to a [`NotificationList`].
  pub fn list_query(&self, filters: Option<NotificationFilters>) -> ApiQuery<NotificationList> {
    ApiQuery::new(
      self.api.clone(),
      self.client.clone(),
      NOTIFICATIONS.list(filters.as_ref()),
      notifications_endpoint(filters.as_ref()),
    )
    .select(transform_notifications_response)
  }

  /// Run the list query once.
  pub async fn list(&self, filters: Option<NotificationFilters>) -> QueryResult<NotificationList> {
    self.list_query(filters).run().await
  }

  /// `PUT /notifications/{id}`; invalidates every notification query.
  pub fn update_mutation(&self) -> ApiMutation<NotificationPatch, Notification> {
    ApiMutation::new(
      self.api.clone(),
      self.client.clone(),
      Endpoint::dynamic(|v: &NotificationPatch| format!("/notifications/{}", v.id)),
      Method::PUT,
    )
    .invalidates(NOTIFICATIONS.all())
    .with_retry(self.mutation_retry)
  }

  pub async fn update(&self, id: &str, update: UpdateNotification) -> Result<Notification, ApiError> {
    self
      .update_mutation()
      .mutate(NotificationPatch {
        id: id.to_string(),
        update,
      })
      .await
  }

  /// `DELETE /notifications/{id}`; invalidates every notification query.
  pub fn delete_mutation(&self) -> ApiMutation<NotificationRef, IgnoredAny> {
    ApiMutation::new(
      self.api.clone(),
      self.client.clone(),
      Endpoint::dynamic(|v: &NotificationRef| format!("/notifications/{}", v.id)),
      Method::DELETE,
    )
    .invalidates(NOTIFICATIONS.all())
    .with_retry(self.mutation_retry)
  }

  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    self.delete_mutation().mutate(NotificationRef::new(id)).await?;
    Ok(())
  }
}
