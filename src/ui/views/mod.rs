mod notification_detail;
mod notification_list;

pub use notification_detail::NotificationDetailView;
pub use notification_list::NotificationListView;
