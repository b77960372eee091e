//! Query keys for each API resource domain.

use crate::cache::{KeyParams, QueryKey};

/// Key factory for one resource domain.
///
/// - `all()` → `[domain]`
/// - `list(filters)` → `[domain, "list", filters]`
/// - `detail(id)` → `[domain, "detail", id]`
///
/// `list` always carries the filter slot, so "no filters" and "empty filters"
/// stay separate cache entries, while both fall under `all()` for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainKeys {
  domain: &'static str,
}

impl DomainKeys {
  pub const fn new(domain: &'static str) -> Self {
    Self { domain }
  }

  pub fn all(&self) -> QueryKey {
    QueryKey::new(self.domain)
  }

  pub fn list<P: KeyParams>(&self, filters: Option<&P>) -> QueryKey {
    self.all().push("list").with_params(filters)
  }

  pub fn detail(&self, id: &str) -> QueryKey {
    self.all().push("detail").push(id)
  }
}

pub const NOTIFICATIONS: DomainKeys = DomainKeys::new("notifications");
pub const USERS: DomainKeys = DomainKeys::new("users");

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{NotificationFilters, NotificationType};
  use crate::cache::KeyPart;

  fn every_filter_combination() -> Vec<NotificationFilters> {
    let mut all = Vec::new();
    for acknowledged in [None, Some(true), Some(false)] {
      for kind in std::iter::once(None).chain(NotificationType::ALL.into_iter().map(Some)) {
        for user_id in [None, Some("u1".to_string()), Some("u2".to_string())] {
          all.push(NotificationFilters {
            acknowledged,
            kind,
            user_id,
          });
        }
      }
    }
    all
  }

  #[test]
  fn test_key_shapes() {
    assert_eq!(NOTIFICATIONS.all().parts().len(), 1);

    let list = NOTIFICATIONS.list::<NotificationFilters>(None);
    assert_eq!(
      list.parts(),
      &[
        KeyPart::Str("notifications".into()),
        KeyPart::Str("list".into()),
        KeyPart::Params(None),
      ]
    );

    let detail = NOTIFICATIONS.detail("42");
    assert_eq!(detail.to_string(), "notifications/detail/42");
  }

  #[test]
  fn test_distinct_filters_give_distinct_keys() {
    let filters = every_filter_combination();
    for (i, a) in filters.iter().enumerate() {
      for (j, b) in filters.iter().enumerate() {
        let ka = NOTIFICATIONS.list(Some(a));
        let kb = NOTIFICATIONS.list(Some(b));
        assert_eq!(i == j, ka == kb, "{:?} vs {:?}", a, b);
      }
    }
  }

  #[test]
  fn test_equal_filter_contents_give_equal_keys() {
    let a = NotificationFilters::unread();
    let b = NotificationFilters {
      acknowledged: Some(false),
      kind: None,
      user_id: None,
    };
    assert_eq!(NOTIFICATIONS.list(Some(&a)), NOTIFICATIONS.list(Some(&b)));
  }

  #[test]
  fn test_all_prefixes_every_key_in_domain() {
    let root = NOTIFICATIONS.all();
    for filters in every_filter_combination() {
      assert!(NOTIFICATIONS.list(Some(&filters)).starts_with(&root));
    }
    assert!(NOTIFICATIONS.list::<NotificationFilters>(None).starts_with(&root));
    assert!(NOTIFICATIONS.detail("1").starts_with(&root));
    assert!(!USERS.all().starts_with(&root));
    assert!(!USERS.list::<NotificationFilters>(None).starts_with(&root));
  }
}
