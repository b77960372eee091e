use crate::ui::renderfns::type_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use notiq::api::{Notification, NotificationPatch, NotificationsApi, UpdateNotification};
use notiq::mutation::{MutationState, MutationTask};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Full text of one notification
pub struct NotificationDetailView {
  api: NotificationsApi,
  notification: Notification,
  update: MutationTask<Notification>,
  status: Option<String>,
}

impl NotificationDetailView {
  pub fn new(api: NotificationsApi, notification: Notification) -> Self {
    Self {
      api,
      notification,
      update: MutationTask::default(),
      status: None,
    }
  }

  fn toggle_acknowledged(&mut self) {
    if self.update.is_loading() {
      return;
    }
    let patch = NotificationPatch {
      id: self.notification.id.clone(),
      update: UpdateNotification {
        acknowledged: !self.notification.acknowledged,
      },
    };
    self.update = self.api.update_mutation().spawn(patch);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let n = &self.notification;
    let title = if self.update.is_loading() {
      format!(" {} (saving...) ", n.id)
    } else {
      format!(" {} ", n.id)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Fields
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Message
      ])
      .split(inner);

    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    let state = if n.acknowledged { "acknowledged" } else { "unread" };
    let fields = vec![
      Line::from(vec![label("Title: "), Span::styled(n.title.as_str(), Style::default().bold())]),
      Line::from(vec![
        label("Type: "),
        Span::styled(n.kind.as_str(), Style::default().fg(type_color(n.kind))),
        Span::raw("  "),
        label("State: "),
        Span::styled(state, Style::default().fg(Color::Yellow)),
      ]),
      Line::from(vec![label("Created: "), Span::raw(n.created_at.as_str())]),
      Line::from(vec![label("User: "), Span::raw(n.user_id.as_str())]),
    ];
    frame.render_widget(Paragraph::new(fields), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let message = Paragraph::new(n.message.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(message, chunks[2]);
  }
}

impl View for NotificationDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('a') => {
        self.toggle_acknowledged();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.notification.id.clone()
  }

  fn tick(&mut self) {
    if !self.update.poll() {
      return;
    }
    match self.update.state() {
      MutationState::Success(updated) => {
        self.notification = updated.clone();
        self.status = None;
      }
      MutationState::Error(e) => {
        self.status = Some(format!("Failed to update notification: {}", e));
      }
      MutationState::Idle | MutationState::Loading => {}
    }
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("a", "ack").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
