use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Per-request options: method, extra headers and an optional JSON body.
#[derive(Debug, Clone)]
pub struct RequestOptions {
  pub method: Method,
  /// Replace the defaults per header name
  pub headers: HeaderMap,
  pub body: Option<String>,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self::new(Method::GET)
  }
}

impl RequestOptions {
  pub fn new(method: Method) -> Self {
    Self {
      method,
      headers: HeaderMap::new(),
      body: None,
    }
  }

  pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  /// Serialize `payload` as the body. Payloads that serialize to `null` or
  /// `{}` send no body.
  pub fn with_json_body<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, ApiError> {
    let value = serde_json::to_value(payload)
      .map_err(|e| ApiError::Validation(format!("payload is not serializable: {}", e)))?;
    let is_empty = match &value {
      serde_json::Value::Null => true,
      serde_json::Value::Object(map) => map.is_empty(),
      _ => false,
    };
    self.body = if is_empty {
      None
    } else {
      Some(value.to_string())
    };
    Ok(self)
  }
}

/// Error body shape the API uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: Option<String>,
}

/// Thin HTTP client that prefixes the base URL, normalizes errors and parses JSON.
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
    })
  }

  /// Client with default settings against `base_url`.
  pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
    Self::new(&ApiConfig {
      base_url: base_url.to_string(),
      ..ApiConfig::default()
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Issue one request to `base_url + endpoint` and parse the JSON response.
  ///
  /// An empty success body parses as JSON `null`.
  pub async fn request<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    options: RequestOptions,
  ) -> Result<T, ApiError> {
    let url = format!("{}{}", self.base_url, endpoint);

    let mut headers = default_headers();
    headers.extend(options.headers);

    let mut request = self
      .http
      .request(options.method.clone(), &url)
      .headers(headers);
    if let Some(body) = options.body {
      request = request.body(body);
    }

    debug!(method = %options.method, url = %url, "sending request");
    let response = request
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;
    debug!(method = %options.method, url = %url, status = status.as_u16(), "received response");

    if !status.is_success() {
      return Err(http_error(status, &text));
    }

    parse_body(&text)
  }
}

fn default_headers() -> HeaderMap {
  let mut headers = HeaderMap::new();
  headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
  headers
}

/// Build the error for a non-2xx response, preferring the server's message.
fn http_error(status: StatusCode, body: &str) -> ApiError {
  let message = serde_json::from_str::<ErrorBody>(body)
    .ok()
    .and_then(|b| b.message)
    .filter(|m| !m.is_empty())
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

  ApiError::Http {
    status: status.as_u16(),
    message,
  }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
  if text.trim().is_empty() {
    return serde_json::from_value(serde_json::Value::Null)
      .map_err(|e| ApiError::Parse(format!("empty response body: {}", e)));
  }
  serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;
  use serde_json::{json, Value};

  #[tokio::test]
  async fn test_prefixes_base_url_and_sets_content_type() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/api/notifications")
      .match_header("content-type", "application/json")
      .with_status(200)
      .with_body(r#"[{"id":"1"}]"#)
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&format!("{}/api/", server.url())).unwrap();
    let body: Value = client
      .request("/notifications", RequestOptions::default())
      .await
      .unwrap();

    assert_eq!(body, json!([{"id": "1"}]));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_caller_headers_override_defaults() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/upload")
      .match_header("content-type", "text/plain")
      .match_header("x-request-id", "abc")
      .with_status(201)
      .with_body("{}")
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let options = RequestOptions::new(Method::POST)
      .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
      .with_header(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_static("abc"),
      );
    let _: Value = client.request("/upload", options).await.unwrap();

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_json_body_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("PUT", "/notifications/1")
      .match_body(Matcher::Json(json!({"acknowledged": true})))
      .with_status(200)
      .with_body("{}")
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let options = RequestOptions::new(Method::PUT)
      .with_json_body(&json!({"acknowledged": true}))
      .unwrap();
    let _: Value = client.request("/notifications/1", options).await.unwrap();

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_error_message_from_body() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/notifications")
      .with_status(404)
      .with_body(r#"{"message":"No such resource"}"#)
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let err = client
      .request::<Value>("/notifications", RequestOptions::default())
      .await
      .unwrap_err();

    assert_eq!(
      err,
      ApiError::Http {
        status: 404,
        message: "No such resource".into()
      }
    );
  }

  #[tokio::test]
  async fn test_unparseable_error_body_uses_generic_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/notifications")
      .with_status(502)
      .with_body("<html>Bad Gateway</html>")
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let err = client
      .request::<Value>("/notifications", RequestOptions::default())
      .await
      .unwrap_err();

    assert_eq!(
      err,
      ApiError::Http {
        status: 502,
        message: "HTTP 502".into()
      }
    );
  }

  #[tokio::test]
  async fn test_malformed_success_body_is_parse_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/notifications")
      .with_status(200)
      .with_body("{not json")
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let err = client
      .request::<Value>("/notifications", RequestOptions::default())
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Parse(_)));
  }

  #[tokio::test]
  async fn test_empty_body_is_null() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("DELETE", "/notifications/1")
      .with_status(204)
      .create_async()
      .await;

    let client = ApiClient::with_base_url(&server.url()).unwrap();
    let body: Value = client
      .request("/notifications/1", RequestOptions::new(Method::DELETE))
      .await
      .unwrap();

    assert_eq!(body, Value::Null);
  }

  #[tokio::test]
  async fn test_unreachable_host_is_network_error() {
    // Port 9 (discard) is closed on test machines; the connect fails fast.
    let client = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
    let err = client
      .request::<Value>("/notifications", RequestOptions::default())
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
  }

  #[test]
  fn test_empty_payload_sends_no_body() {
    let options = RequestOptions::new(Method::DELETE)
      .with_json_body(&json!({}))
      .unwrap();
    assert!(options.body.is_none());

    let options = RequestOptions::new(Method::POST)
      .with_json_body(&json!({"a": 1}))
      .unwrap();
    assert_eq!(options.body.as_deref(), Some(r#"{"a":1}"#));
  }
}
