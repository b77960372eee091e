use notiq::api::NotificationType;
use ratatui::prelude::Color;

/// Truncate to at most `max_len` chars, ending in "..." if cut.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a notification type
pub fn type_color(kind: NotificationType) -> Color {
  match kind {
    NotificationType::Info => Color::Blue,
    NotificationType::Success => Color::Green,
    NotificationType::Warning => Color::Yellow,
    NotificationType::Error => Color::Red,
  }
}
