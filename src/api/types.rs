use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::cache::KeyParams;
use crate::error::ApiError;

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
  Info,
  Success,
  Warning,
  Error,
}

impl NotificationType {
  pub const ALL: [NotificationType; 4] = [
    NotificationType::Info,
    NotificationType::Success,
    NotificationType::Warning,
    NotificationType::Error,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      NotificationType::Info => "info",
      NotificationType::Success => "success",
      NotificationType::Warning => "warning",
      NotificationType::Error => "error",
    }
  }
}

impl fmt::Display for NotificationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NotificationType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    NotificationType::ALL
      .into_iter()
      .find(|t| t.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| format!("unknown notification type '{}' (expected info, success, warning or error)", s))
  }
}

/// A notification as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  pub title: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationType,
  pub acknowledged: bool,
  pub created_at: String,
  pub user_id: String,
}

impl Notification {
  /// Date portion of `created_at` for list display.
  pub fn created_date(&self) -> &str {
    self.created_at.split('T').next().unwrap_or(&self.created_at)
  }
}

/// Optional constraints for listing notifications; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilters {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub acknowledged: Option<bool>,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<NotificationType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
}

impl NotificationFilters {
  /// Notifications not yet acknowledged.
  pub fn unread() -> Self {
    Self {
      acknowledged: Some(false),
      ..Default::default()
    }
  }

  pub fn read() -> Self {
    Self {
      acknowledged: Some(true),
      ..Default::default()
    }
  }

  pub fn of_type(kind: NotificationType) -> Self {
    Self {
      kind: Some(kind),
      ..Default::default()
    }
  }

  /// Set fields as `(name, value)` pairs in wire order.
  pub fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(acknowledged) = self.acknowledged {
      pairs.push(("acknowledged", acknowledged.to_string()));
    }
    if let Some(kind) = self.kind {
      pairs.push(("type", kind.to_string()));
    }
    if let Some(user_id) = &self.user_id {
      pairs.push(("userId", user_id.clone()));
    }
    pairs
  }

  /// URL-encoded query string without the leading `?`.
  pub fn to_query_string(&self) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in self.pairs() {
      serializer.append_pair(name, &value);
    }
    serializer.finish()
  }

  /// Short label for headers and breadcrumbs.
  pub fn label(&self) -> String {
    let pairs = self.pairs();
    if pairs.is_empty() {
      return "all".to_string();
    }
    pairs
      .iter()
      .map(|(name, value)| format!("{}={}", name, value))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl KeyParams for NotificationFilters {
  fn key_params(&self) -> Vec<(&'static str, String)> {
    self.pairs()
  }
}

/// Body of `PUT /notifications/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNotification {
  pub acknowledged: bool,
}

/// A user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub created_at: String,
}

impl User {
  /// Check a raw response body against the user shape.
  pub fn from_response(body: serde_json::Value) -> Result<Self, ApiError> {
    serde_json::from_value(body)
      .map_err(|e| ApiError::Validation(format!("unexpected user response: {}", e)))
  }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 2;
const MAX_EMAIL_LEN: usize = 254;

/// Body of `POST /users`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub password: String,
}

impl CreateUser {
  /// Check the payload shape before it is sent.
  pub fn validate(&self) -> Result<(), ApiError> {
    let mut problems = Vec::new();

    if !is_valid_email(&self.email) {
      problems.push("email: invalid email address".to_string());
    }
    if self.first_name.chars().count() < MIN_NAME_LEN {
      problems.push(format!("firstName: must be at least {} characters", MIN_NAME_LEN));
    }
    if self.last_name.chars().count() < MIN_NAME_LEN {
      problems.push(format!("lastName: must be at least {} characters", MIN_NAME_LEN));
    }
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      problems.push(format!("password: must be at least {} characters", MIN_PASSWORD_LEN));
    }

    if problems.is_empty() {
      Ok(())
    } else {
      Err(ApiError::Validation(problems.join("; ")))
    }
  }
}

// Password is write-only: never printed.
impl fmt::Debug for CreateUser {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CreateUser")
      .field("email", &self.email)
      .field("first_name", &self.first_name)
      .field("last_name", &self.last_name)
      .field("password", &"<redacted>")
      .finish()
  }
}

fn email_regex() -> &'static Regex {
  static EMAIL: OnceLock<Regex> = OnceLock::new();
  EMAIL.get_or_init(|| {
    Regex::new(
      r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email pattern is valid")
  })
}

fn is_valid_email(email: &str) -> bool {
  email.len() <= MAX_EMAIL_LEN && email_regex().is_match(email)
}
