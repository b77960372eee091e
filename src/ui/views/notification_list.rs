use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{truncate, type_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::NotificationDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use notiq::api::{
  Notification, NotificationFilters, NotificationList, NotificationPatch, NotificationRef,
  NotificationsApi, UpdateNotification,
};
use notiq::mutation::MutationTask;
use notiq::query::Query;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use serde::de::IgnoredAny;

/// Notification list for one filter set
pub struct NotificationListView {
  api: NotificationsApi,
  filters: Option<NotificationFilters>,
  query: Query<NotificationList>,
  list_state: ListState,
  update: MutationTask<Notification>,
  delete: MutationTask<IgnoredAny>,
  status: Option<String>,
}

impl NotificationListView {
  pub fn new(api: NotificationsApi, filters: Option<NotificationFilters>) -> Self {
    let mut query = Query::from_api(api.list_query(filters.clone()));
    query.fetch();

    Self {
      api,
      filters,
      query,
      list_state: ListState::default(),
      update: MutationTask::default(),
      delete: MutationTask::default(),
      status: None,
    }
  }

  fn notifications(&self) -> &[Notification] {
    self.query.data().map(|l| l.items.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Notification> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.notifications().get(idx))
  }

  fn label(&self) -> String {
    self
      .filters
      .as_ref()
      .map(|f| f.label())
      .unwrap_or_else(|| "all".to_string())
  }

  fn toggle_acknowledged(&mut self) {
    let Some(notification) = self.selected() else {
      return;
    };
    let patch = NotificationPatch {
      id: notification.id.clone(),
      update: UpdateNotification {
        acknowledged: !notification.acknowledged,
      },
    };
    self.update = self.api.update_mutation().spawn(patch);
  }

  fn delete_selected(&mut self) {
    let Some(notification) = self.selected() else {
      return;
    };
    let target = NotificationRef::new(notification.id.clone());
    self.delete = self.api.delete_mutation().spawn(target);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.notifications().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.query.is_loading() && self.query.data().is_none() {
      format!(" Notifications [{}] (loading...) ", self.label())
    } else if let Some(e) = self.query.error() {
      format!(" Notifications [{}] (error: {}) ", self.label(), e)
    } else {
      format!(" Notifications [{}] ({}) ", self.label(), len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.query.is_loading() {
        "Loading notifications..."
      } else if self.query.is_error() {
        "Failed to load notifications. Press 'r' to retry."
      } else {
        "No notifications."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .notifications()
      .iter()
      .map(|n| {
        let (marker, title_style) = if n.acknowledged {
          (" ", Style::default().fg(Color::DarkGray))
        } else {
          ("●", Style::default().bold())
        };

        let line = Line::from(vec![
          Span::styled(marker, Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(format!("{:<8}", n.kind.as_str()), Style::default().fg(type_color(n.kind))),
          Span::raw(" "),
          Span::styled(format!("{:<32}", truncate(&n.title, 32)), title_style),
          Span::raw(" "),
          Span::styled(n.created_date().to_string(), Style::default().fg(Color::DarkGray)),
          Span::raw("  "),
          Span::raw(truncate(&n.message, 60)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for NotificationListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('a') => self.toggle_acknowledged(),
      KeyCode::Char('d') => self.delete_selected(),
      KeyCode::Enter => {
        if let Some(notification) = self.selected() {
          return ViewAction::Push(Box::new(NotificationDetailView::new(
            self.api.clone(),
            notification.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Notifications [{}]", self.label())
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.update.poll() {
      self.status = self
        .update
        .error()
        .map(|e| format!("Failed to update notification: {}", e));
    }
    if self.delete.poll() {
      self.status = self
        .delete
        .error()
        .map(|e| format!("Failed to delete notification: {}", e));
    }
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref().or_else(|| {
      self
        .query
        .data()
        .and_then(|l| l.warning.as_ref())
        .map(|_| "Unexpected API response structure")
    })
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "ack").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
