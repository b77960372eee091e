//! Hierarchical query keys.
//!
//! A key is an ordered sequence of parts, e.g. `notifications / list / {acknowledged=false}`.
//! Keys double as invalidation targets: invalidating a key invalidates every
//! key that starts with it.

use std::collections::BTreeMap;
use std::fmt;

/// Types that can sit in a key as a parameter object (typically filter bundles).
///
/// Only set fields should be returned; the pairs are stored sorted, so the
/// order they come back in does not affect key identity.
pub trait KeyParams {
  fn key_params(&self) -> Vec<(&'static str, String)>;
}

/// One token of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Str(String),
  /// A parameter object; `None` when the caller passed none at all
  Params(Option<BTreeMap<String, String>>),
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Str(s) => write!(f, "{}", s),
      KeyPart::Params(None) => write!(f, "-"),
      KeyPart::Params(Some(params)) => {
        let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(","))
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  parts: Vec<KeyPart>,
}

impl QueryKey {
  /// Root key for a resource domain.
  pub fn new(domain: &str) -> Self {
    Self {
      parts: vec![KeyPart::Str(domain.to_string())],
    }
  }

  /// Append a string token.
  pub fn push(mut self, part: &str) -> Self {
    self.parts.push(KeyPart::Str(part.to_string()));
    self
  }

  /// Append a parameter object slot, present even when `params` is `None`.
  pub fn with_params<P: KeyParams + ?Sized>(mut self, params: Option<&P>) -> Self {
    let map = params.map(|p| {
      p.key_params()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect::<BTreeMap<_, _>>()
    });
    self.parts.push(KeyPart::Params(map));
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.parts
  }

  /// Whether `prefix` matches the leading parts of this key.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.parts.starts_with(&prefix.parts)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
    write!(f, "{}", parts.join("/"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Pairs(Vec<(&'static str, String)>);

  impl KeyParams for Pairs {
    fn key_params(&self) -> Vec<(&'static str, String)> {
      self.0.clone()
    }
  }

  #[test]
  fn test_param_order_does_not_matter() {
    let a = Pairs(vec![("a", "1".into()), ("b", "2".into())]);
    let b = Pairs(vec![("b", "2".into()), ("a", "1".into())]);

    let ka = QueryKey::new("x").push("list").with_params(Some(&a));
    let kb = QueryKey::new("x").push("list").with_params(Some(&b));
    assert_eq!(ka, kb);
  }

  #[test]
  fn test_absent_and_empty_params_are_distinct() {
    let empty = Pairs(Vec::new());
    let none = QueryKey::new("x").push("list").with_params::<Pairs>(None);
    let some = QueryKey::new("x").push("list").with_params(Some(&empty));
    assert_ne!(none, some);
    assert_eq!(none.parts().len(), 3);
  }

  #[test]
  fn test_starts_with() {
    let root = QueryKey::new("notifications");
    let list = root.clone().push("list").with_params::<Pairs>(None);
    let other = QueryKey::new("users");

    assert!(list.starts_with(&root));
    assert!(root.starts_with(&root));
    assert!(!root.starts_with(&list));
    assert!(!other.starts_with(&root));
  }

  #[test]
  fn test_display() {
    let params = Pairs(vec![("type", "error".into()), ("acknowledged", "false".into())]);
    let key = QueryKey::new("notifications")
      .push("list")
      .with_params(Some(&params));
    assert_eq!(
      key.to_string(),
      "notifications/list/{acknowledged=false,type=error}"
    );
  }
}
