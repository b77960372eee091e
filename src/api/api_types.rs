//! Response envelopes as the API actually sends them.
//!
//! The notifications endpoint is inconsistent about wrapping its payload, so
//! the body is classified into a known envelope before the list is extracted.

use serde_json::Value;
use tracing::warn;

use super::types::Notification;
use crate::error::{ApiError, NormalizationWarning};

/// Known shapes of the `GET /notifications` body.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationsEnvelope {
  /// `[...]`
  Bare(Value),
  /// `{"data": [...]}`
  Data(Value),
  /// `{"notifications": [...]}`
  Notifications(Value),
  /// Anything else
  Unrecognized(Value),
}

impl NotificationsEnvelope {
  /// Classify a body by structure; `data` wins over `notifications`.
  pub fn classify(body: Value) -> Self {
    match body {
      Value::Array(_) => NotificationsEnvelope::Bare(body),
      Value::Object(mut map) => {
        if matches!(map.get("data"), Some(Value::Array(_))) {
          return NotificationsEnvelope::Data(map.remove("data").unwrap_or_default());
        }
        if matches!(map.get("notifications"), Some(Value::Array(_))) {
          return NotificationsEnvelope::Notifications(
            map.remove("notifications").unwrap_or_default(),
          );
        }
        NotificationsEnvelope::Unrecognized(Value::Object(map))
      }
      other => NotificationsEnvelope::Unrecognized(other),
    }
  }
}

/// Notifications extracted from a list response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationList {
  pub items: Vec<Notification>,
  /// Set when the envelope was not recognised and `items` is empty because of it
  pub warning: Option<NormalizationWarning>,
}

impl NotificationList {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn unread_count(&self) -> usize {
    self.items.iter().filter(|n| !n.acknowledged).count()
  }
}

/// Normalize a list response into notifications.
///
/// Arrays pass through, `{data}` and `{notifications}` wrappers are unwrapped,
/// anything else yields an empty list with a warning. Elements that don't
/// match the notification shape are a parse error.
pub fn transform_notifications_response(body: &Value) -> Result<NotificationList, ApiError> {
  let items = match NotificationsEnvelope::classify(body.clone()) {
    NotificationsEnvelope::Bare(items)
    | NotificationsEnvelope::Data(items)
    | NotificationsEnvelope::Notifications(items) => items,
    NotificationsEnvelope::Unrecognized(other) => {
      let warning = NormalizationWarning {
        received: describe(&other),
      };
      warn!("{}", warning);
      return Ok(NotificationList {
        items: Vec::new(),
        warning: Some(warning),
      });
    }
  };

  let items: Vec<Notification> =
    serde_json::from_value(items).map_err(|e| ApiError::Parse(format!("notification list: {}", e)))?;
  Ok(NotificationList {
    items,
    warning: None,
  })
}

fn describe(value: &Value) -> String {
  match value {
    Value::Null => "null".to_string(),
    Value::Bool(_) => "boolean".to_string(),
    Value::Number(_) => "number".to_string(),
    Value::String(_) => "string".to_string(),
    Value::Array(_) => "array".to_string(),
    Value::Object(map) => {
      let keys: Vec<&str> = map.keys().map(String::as_str).collect();
      format!("object with keys [{}]", keys.join(", "))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample() -> Value {
    json!({
      "id": "1",
      "title": "Build failed",
      "message": "main is red",
      "type": "error",
      "acknowledged": false,
      "createdAt": "2024-05-01T10:00:00Z",
      "userId": "u1"
    })
  }

  #[test]
  fn test_bare_array_unchanged() {
    let list = transform_notifications_response(&json!([sample()])).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.items[0].id, "1");
    assert!(list.warning.is_none());
  }

  #[test]
  fn test_data_envelope_unwrapped() {
    let list = transform_notifications_response(&json!({ "data": [sample(), sample()] })).unwrap();
    assert_eq!(list.len(), 2);
  }

  #[test]
  fn test_notifications_envelope_unwrapped() {
    let list =
      transform_notifications_response(&json!({ "notifications": [sample()], "total": 1 })).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.unread_count(), 1);
  }

  #[test]
  fn test_data_checked_before_notifications() {
    let envelope = NotificationsEnvelope::classify(json!({ "data": [], "notifications": [sample()] }));
    assert_eq!(envelope, NotificationsEnvelope::Data(json!([])));
  }

  #[test]
  fn test_non_array_data_falls_through() {
    let envelope = NotificationsEnvelope::classify(json!({ "data": {"x": 1}, "notifications": [] }));
    assert_eq!(envelope, NotificationsEnvelope::Notifications(json!([])));
  }

  #[test]
  fn test_anything_else_is_empty_with_warning() {
    for body in [json!({ "items": [sample()] }), json!("oops"), json!(42), Value::Null] {
      let list = transform_notifications_response(&body).unwrap();
      assert!(list.is_empty());
      assert!(list.warning.is_some(), "no warning for {}", body);
    }

    let list = transform_notifications_response(&json!({ "items": [] })).unwrap();
    assert_eq!(
      list.warning.unwrap().received,
      "object with keys [items]".to_string()
    );
  }

  #[test]
  fn test_malformed_element_is_parse_error() {
    let result = transform_notifications_response(&json!([{ "id": 1 }]));
    assert!(matches!(result, Err(ApiError::Parse(_))));
  }
}
