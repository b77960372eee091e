use crate::commands::{self, CommandAction};
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::HeaderInfo;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::NotificationListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use notiq::api::{NotificationFilters, NotificationList, NotificationType, NotificationsApi};
use notiq::query::Query;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  notifications: NotificationsApi,
  base_url: String,

  /// Header counters; refetched whenever a mutation invalidates notifications
  unread: Query<NotificationList>,
  errors: Query<NotificationList>,

  /// App-level message (e.g. unknown command)
  status: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(notifications: NotificationsApi, base_url: String) -> Self {
    let mut unread = Query::from_api(notifications.list_query(Some(NotificationFilters::unread())));
    unread.fetch();
    let mut errors = Query::from_api(
      notifications.list_query(Some(NotificationFilters::of_type(NotificationType::Error))),
    );
    errors.fetch();

    let root = NotificationListView::new(notifications.clone(), None);

    Self {
      view_stack: vec![Box::new(root)],
      command: CommandInput::new(),
      notifications,
      base_url,
      unread,
      errors,
      status: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!(base_url = %self.base_url, "tui started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    self.unread.poll();
    self.errors.poll();
    if let Some(view) = self.view_stack.last_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Handled => return,
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) => return,
      KeyResult::NotHandled => {}
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    match commands::resolve(cmd) {
      Some(CommandAction::Filter(filters)) => {
        let view = NotificationListView::new(self.notifications.clone(), filters);
        self.view_stack.clear();
        self.view_stack.push(Box::new(view));
        self.status = None;
      }
      Some(CommandAction::Quit) => self.should_quit = true,
      None => self.status = Some(format!("Unknown command: {}", cmd)),
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn header_info(&self) -> HeaderInfo<'_> {
    HeaderInfo {
      base_url: &self.base_url,
      unread: self.unread.data().map(NotificationList::len),
      errors: self.errors.data().map(NotificationList::len),
    }
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  /// View status first, then the app's own message
  pub fn status(&self) -> Option<&str> {
    self
      .view_stack
      .last()
      .and_then(|v| v.status())
      .or(self.status.as_deref())
  }
}
