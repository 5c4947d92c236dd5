//! Terminal front end for the attendance tracker.
//!
//! # Responsibility
//! - Load configuration, logging and the SQLite store.
//! - Map typed commands onto controller operations and print the list view.

use attendance_core::{
    init_logging, AppConfig, AttendanceController, AttendanceView, SessionManager,
    SessionNotifier, SqliteStudentStore, StudentId, SyncClient, SyncError,
};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands:
  add <name>            add a student
  present <id>          mark a student present
  list                  show the student list
  reload                reload the list from the store
  login <id> <secret>   sign in (any non-empty pair is accepted)
  logout                sign out
  help                  show this help
  quit                  exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Add(String),
    Present(StudentId),
    List,
    Reload,
    Login { identifier: String, secret: String },
    Logout,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match verb {
        "add" => Ok(Command::Add(rest.to_string())),
        "present" => rest
            .parse()
            .map(Command::Present)
            .map_err(|_| format!("expected a numeric student id, got `{rest}`")),
        "list" => Ok(Command::List),
        "reload" => Ok(Command::Reload),
        "login" => {
            let (identifier, secret) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Ok(Command::Login {
                identifier: identifier.to_string(),
                secret: secret.trim().to_string(),
            })
        }
        "logout" => Ok(Command::Logout),
        "help" | "" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command `{other}`; type `help`")),
    }
}

fn print_view(view: &AttendanceView) {
    println!("== {} ==", view.title);
    if let Some(message) = view.empty_message {
        println!("{message}");
    }
    for row in &view.rows {
        println!("  [{}] {}", row.id, row.label);
    }
}

fn print_error(err: &SyncError) {
    if err.is_retryable() {
        eprintln!("error: {err} (retry)");
    } else {
        eprintln!("error: {err}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    println!("attendance_core ping={}", attendance_core::ping());
    println!("attendance_core version={}", attendance_core::core_version());

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let opened = match config.db_path.as_deref() {
        Some(path) => SqliteStudentStore::open(path),
        None => SqliteStudentStore::open_in_memory(),
    };
    let store = match opened {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("error: cannot open student database: {err}");
            return ExitCode::FAILURE;
        }
    };

    let sessions = SessionManager::new(SessionNotifier::new());
    let client = SyncClient::new(store).with_timeout(config.store_timeout);
    let mut controller = AttendanceController::new(client);
    match controller.start(sessions.notifier()).await {
        Ok(()) => print_view(&controller.render()),
        Err(err) => print_error(&err),
    }
    info!("event=cli_start module=cli status=ok");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("error: failed to read input: {err}");
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("error: {message}");
                continue;
            }
        };

        let outcome = match command {
            Command::Add(name) => {
                controller.set_pending_name(name);
                controller.submit_add().await.map(|_| true)
            }
            Command::Present(id) => controller.request_increment(id).await.map(|_| true),
            Command::List => Ok(true),
            Command::Reload => controller.reload().await.map(|_| true),
            Command::Login { identifier, secret } => {
                match sessions.login(&identifier, &secret) {
                    Ok(session) => println!("signed in as {}", session.identifier),
                    Err(err) => eprintln!("error: {err}"),
                }
                Ok(false)
            }
            Command::Logout => {
                sessions.logout();
                Ok(false)
            }
            Command::Help => {
                println!("{HELP}");
                Ok(false)
            }
            Command::Quit => break,
        };

        controller.poll_session();
        match outcome {
            Ok(true) => print_view(&controller.render()),
            Ok(false) => {}
            Err(err) => print_error(&err),
        }
    }

    controller.shutdown();
    info!("event=cli_exit module=cli status=ok");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::{parse_command, Command};

    #[test]
    fn parses_add_with_inner_spaces() {
        assert_eq!(
            parse_command("add  Mary Ann ").unwrap(),
            Command::Add("Mary Ann".to_string())
        );
    }

    #[test]
    fn parses_present_id_and_rejects_garbage() {
        assert_eq!(parse_command("present 3").unwrap(), Command::Present(3));
        assert!(parse_command("present three").is_err());
    }

    #[test]
    fn parses_login_pair() {
        assert_eq!(
            parse_command("login a@b.c hunter2").unwrap(),
            Command::Login {
                identifier: "a@b.c".to_string(),
                secret: "hunter2".to_string(),
            }
        );
    }

    #[test]
    fn blank_line_shows_help_and_unknown_is_error() {
        assert_eq!(parse_command("   ").unwrap(), Command::Help);
        assert!(parse_command("dance").is_err());
    }
}
