//! Available commands and autocomplete logic

use notiq::api::{NotificationFilters, NotificationType};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "all",
    aliases: &["a", "notifications", "n"],
    description: "All notifications",
  },
  Command {
    name: "unread",
    aliases: &["u", "new"],
    description: "Unacknowledged notifications",
  },
  Command {
    name: "read",
    aliases: &["acked", "done"],
    description: "Acknowledged notifications",
  },
  Command {
    name: "info",
    aliases: &["i"],
    description: "Info notifications",
  },
  Command {
    name: "success",
    aliases: &["s", "ok"],
    description: "Success notifications",
  },
  Command {
    name: "warning",
    aliases: &["w", "warn"],
    description: "Warning notifications",
  },
  Command {
    name: "errors",
    aliases: &["e", "error"],
    description: "Error notifications",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit notiq",
  },
];

/// What a resolved command asks the app to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
  /// Show the notification list with these filters
  Filter(Option<NotificationFilters>),
  Quit,
}

/// Map a command name (as produced by autocomplete) to its action.
pub fn resolve(name: &str) -> Option<CommandAction> {
  let action = match name {
    "all" => CommandAction::Filter(None),
    "unread" => CommandAction::Filter(Some(NotificationFilters::unread())),
    "read" => CommandAction::Filter(Some(NotificationFilters::read())),
    "info" => CommandAction::Filter(Some(NotificationFilters::of_type(NotificationType::Info))),
    "success" => CommandAction::Filter(Some(NotificationFilters::of_type(NotificationType::Success))),
    "warning" => CommandAction::Filter(Some(NotificationFilters::of_type(NotificationType::Warning))),
    "errors" => CommandAction::Filter(Some(NotificationFilters::of_type(NotificationType::Error))),
    "quit" => CommandAction::Quit,
    _ => return None,
  };
  Some(action)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let rank = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, rank));
  }

  // Stable: ties keep declaration order
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
