//! Error taxonomy shared by the request executor, the cache and the hooks.

use std::fmt;
use thiserror::Error;

/// Errors surfaced by API calls.
///
/// Cloneable so a single failed fetch can be handed to every observer that
/// joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// The request never produced a response (DNS, connect, timeout, ...)
  #[error("Network error: {0}")]
  Network(String),

  /// The server answered with a non-2xx status
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  /// The response body was not valid JSON for the expected type
  #[error("Failed to parse response: {0}")]
  Parse(String),

  /// A payload or response failed its shape check
  #[error("Validation failed: {0}")]
  Validation(String),
}

impl ApiError {
  /// Whether retrying the same request could plausibly succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      ApiError::Network(_) => true,
      ApiError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
      ApiError::Parse(_) | ApiError::Validation(_) => false,
    }
  }

  /// HTTP status, if the server responded.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Non-fatal: the response envelope had a shape we don't recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
  /// Short description of what was received (e.g. "object with keys [items]")
  pub received: String,
}

impl fmt::Display for NormalizationWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Unexpected API response structure: {}", self.received)
  }
}
