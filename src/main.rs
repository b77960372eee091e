mod app;
mod commands;
mod event;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use notiq::api::{
  ApiClient, CreateUser, NotificationFilters, NotificationType, NotificationsApi,
  UpdateNotification, UsersApi,
};
use notiq::cache::{MemoryStorage, NoopStorage, QueryClient};
use notiq::config::Config;
use notiq::logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notiq")]
#[command(about = "Browse and manage notifications from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./notiq.yaml, then $XDG_CONFIG_HOME/notiq/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// API base URL, overriding config and NOTIQ_API_BASE_URL
  #[arg(long, global = true)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Print notifications
  List {
    /// Only unacknowledged notifications
    #[arg(long, conflicts_with = "read")]
    unread: bool,

    /// Only acknowledged notifications
    #[arg(long)]
    read: bool,

    /// Only this type (info, success, warning, error)
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<NotificationType>,

    /// Only notifications for this user
    #[arg(long = "user", value_name = "ID")]
    user_id: Option<String>,
  },

  /// Mark a notification as acknowledged
  Ack {
    id: String,

    /// Mark as unread instead
    #[arg(long)]
    undo: bool,
  },

  /// Delete a notification
  Delete { id: String },

  /// Create a user account
  CreateUser {
    #[arg(long)]
    email: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long, env = "NOTIQ_USER_PASSWORD", hide_env_values = true)]
    password: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if args.base_url.is_some() {
    config.apply_base_url_override(args.base_url.clone());
    config.validate()?;
  }

  let api = ApiClient::new(&config.api).map_err(|e| eyre!(e))?;
  let client = if config.cache.enabled {
    QueryClient::new(MemoryStorage::new())
  } else {
    QueryClient::new(NoopStorage)
  }
  .with_options(config.query_options());

  let notifications =
    NotificationsApi::new(api.clone(), client.clone()).with_mutation_retry(config.mutation_retry());

  match args.command {
    None => {
      // Keep the guard alive for the whole session so logs are flushed
      let _guard = match config.log_dir() {
        Some(dir) => Some(
          logging::init_file(&dir, &config.log.level)
            .wrap_err_with(|| format!("Failed to open log directory {}", dir.display()))?,
        ),
        None => None,
      };
      let mut app = app::App::new(notifications, config.api.base_url.clone());
      app.run().await?;
    }
    Some(cmd) => {
      logging::init_stderr(&config.log.level);
      let users = UsersApi::new(api, client).with_mutation_retry(config.mutation_retry());
      run_command(cmd, &notifications, &users).await?;
    }
  }

  Ok(())
}

async fn run_command(cmd: Cmd, notifications: &NotificationsApi, users: &UsersApi) -> Result<()> {
  match cmd {
    Cmd::List {
      unread,
      read,
      kind,
      user_id,
    } => {
      let result = notifications.list(list_filters(unread, read, kind, user_id)).await;
      if let Some(error) = result.error {
        return Err(eyre!(error).wrap_err("Failed to list notifications"));
      }
      let list = result.data.unwrap_or_default();
      if let Some(warning) = &list.warning {
        eprintln!("warning: {}", warning);
      }
      for n in &list.items {
        println!(
          "{} {:<10} {:<8} {}  {}",
          if n.acknowledged { " " } else { "*" },
          n.id,
          n.kind.as_str(),
          n.created_date(),
          n.title
        );
      }
      println!("{} notification(s), {} unread", list.len(), list.unread_count());
    }
    Cmd::Ack { id, undo } => {
      let updated = notifications
        .update(&id, UpdateNotification { acknowledged: !undo })
        .await
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| format!("Failed to update notification {}", id))?;
      let state = if updated.acknowledged { "acknowledged" } else { "unread" };
      println!("{} is now {}", updated.id, state);
    }
    Cmd::Delete { id } => {
      notifications
        .delete(&id)
        .await
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| format!("Failed to delete notification {}", id))?;
      println!("Deleted {}", id);
    }
    Cmd::CreateUser {
      email,
      first_name,
      last_name,
      password,
    } => {
      let user = users
        .create(CreateUser {
          email,
          first_name,
          last_name,
          password,
        })
        .await
        .map_err(|e| eyre!(e))
        .wrap_err("Failed to create user")?;
      println!("Created user {} ({}) <{}>", user.id, user.full_name(), user.email);
    }
  }
  Ok(())
}

/// Filters from the `list` flags; `None` without any flag so the request
/// shares its cache entry with the TUI's unfiltered list.
fn list_filters(
  unread: bool,
  read: bool,
  kind: Option<NotificationType>,
  user_id: Option<String>,
) -> Option<NotificationFilters> {
  let filters = NotificationFilters {
    acknowledged: if unread {
      Some(false)
    } else if read {
      Some(true)
    } else {
      None
    },
    kind,
    user_id,
  };
  (filters != NotificationFilters::default()).then_some(filters)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_definition_is_valid() {
    use clap::CommandFactory;
    Args::command().debug_assert();
  }

  #[test]
  fn test_parse_list_filters() {
    let args = Args::parse_from(["notiq", "list", "--unread", "--type", "error", "--user", "u1"]);
    match args.command {
      Some(Cmd::List {
        unread,
        read,
        kind,
        user_id,
      }) => {
        assert!(unread);
        assert!(!read);
        assert_eq!(kind, Some(NotificationType::Error));
        assert_eq!(user_id.as_deref(), Some("u1"));
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn test_global_base_url_after_subcommand() {
    let args = Args::parse_from(["notiq", "ack", "42", "--undo", "--base-url", "http://api.test"]);
    assert_eq!(args.base_url.as_deref(), Some("http://api.test"));
    assert!(matches!(args.command, Some(Cmd::Ack { ref id, undo: true }) if id == "42"));
  }

  #[test]
  fn test_list_without_flags_has_no_filters() {
    assert_eq!(list_filters(false, false, None, None), None);
    assert_eq!(
      list_filters(true, false, None, None),
      Some(NotificationFilters::unread())
    );
    assert_eq!(
      list_filters(false, false, Some(NotificationType::Error), None),
      Some(NotificationFilters::of_type(NotificationType::Error))
    );
  }

  #[test]
  fn test_no_subcommand_starts_tui() {
    let args = Args::parse_from(["notiq"]);
    assert!(args.command.is_none());
  }
}
