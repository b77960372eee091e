//! User mutations.

use reqwest::Method;
use serde_json::Value;

use super::client::ApiClient;
use super::query_keys::USERS;
use super::types::{CreateUser, User};
use crate::cache::QueryClient;
use crate::error::ApiError;
use crate::mutation::ApiMutation;
use crate::retry::RetryPolicy;

#[derive(Clone, Debug)]
pub struct UsersApi {
  api: ApiClient,
  client: QueryClient,
  mutation_retry: RetryPolicy,
}

impl UsersApi {
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

  /// `POST /users`; invalidates every user query. The response is left raw
  /// so [`UsersApi::create`] can check its shape.
  pub fn create_mutation(&self) -> ApiMutation<CreateUser, Value> {
    ApiMutation::new(self.api.clone(), self.client.clone(), "/users", Method::POST)
      .invalidates(USERS.all())
      .with_retry(self.mutation_retry)
  }

  /// Validate the payload, create the user and check the response.
  ///
  /// An invalid payload never reaches the network.
  pub async fn create(&self, payload: CreateUser) -> Result<User, ApiError> {
    payload.validate()?;
    let body = self.create_mutation().mutate(payload).await?;
    User::from_response(body)
  }
}
