use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides shortcuts. Counts are `None` until their
/// query has loaded.
#[derive(Debug, Clone, Default)]
pub struct HeaderInfo<'a> {
  pub base_url: &'a str,
  pub unread: Option<usize>,
  pub errors: Option<usize>,
}

/// Draw the header bar with logo, API host, counters and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let separator = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" notiq ", Style::default().fg(Color::Cyan).bold()),
    separator(),
    Span::styled(
      format!(" {} ", extract_host(info.base_url)),
      Style::default().fg(Color::White),
    ),
    separator(),
    Span::styled(
      format!(" unread {} ", format_count(info.unread)),
      Style::default().fg(Color::Yellow).bold(),
    ),
    separator(),
    Span::styled(
      format!(" errors {} ", format_count(info.errors)),
      Style::default().fg(Color::Red).bold(),
    ),
    Span::raw(" "),
  ];

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn format_count(count: Option<usize>) -> String {
  count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Host (and port) part of the API base URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
