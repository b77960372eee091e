//! REST API surface: request executor, wire types, query keys and the
//! resource hooks built on top of them.

pub mod api_types;
pub mod client;
pub mod notifications;
pub mod query_keys;
pub mod types;
pub mod users;

pub use api_types::{transform_notifications_response, NotificationList};
pub use client::{ApiClient, RequestOptions};
pub use notifications::{NotificationPatch, NotificationRef, NotificationsApi};
pub use query_keys::{DomainKeys, NOTIFICATIONS, USERS};
pub use types::{
  CreateUser, Notification, NotificationFilters, NotificationType, UpdateNotification, User,
};
pub use users::UsersApi;
