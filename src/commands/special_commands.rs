//! Special commands parser for interactive chat mode
//!
//! This module parses the slash commands that can be entered during an
//! interactive chat. Special commands let the user:
//! - Browse and switch sessions
//! - Browse folders and scope the chat to a document
//! - Resize, hide and show the widget
//! - View status, display help and exit
//!
//! Commands are prefixed with `/` and are case-insensitive. Identifiers keep
//! the case they were typed with.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands drive the widget rather than being sent to the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Toggle the sessions panel
    ShowSessions,

    /// Switch to the session with this id
    SelectSession(String),

    /// Start an empty, unscoped conversation
    NewChat,

    /// Toggle the folder tree panel
    ShowFiles,

    /// Expand or collapse a folder
    ToggleFolder(String),

    /// Scope the conversation to a document
    SelectFile(String),

    /// Drop the document scope
    ClearFile,

    /// Enlarge the widget one step
    Grow,

    /// Shrink the widget one step
    Shrink,

    /// Collapse the widget, keeping the conversation
    Hide,

    /// Reopen the widget with a fresh conversation
    Show,

    /// Display current session, file and widget status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; regular prompt text
    None,
}

/// Split `/command arg` into the lowercased command and the raw argument
fn split_command(trimmed: &str) -> (String, Option<&str>) {
    match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => {
            let rest = rest.trim();
            (
                command.to_lowercase(),
                (!rest.is_empty()).then_some(rest),
            )
        }
        None => (trimmed.to_lowercase(), None),
    }
}

fn require_arg(command: &str, arg: Option<&str>, usage: &str) -> Result<String, CommandError> {
    arg.map(str::to_string)
        .ok_or_else(|| CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
}

fn no_arg(command: &str, arg: Option<&str>, parsed: SpecialCommand) -> Result<SpecialCommand, CommandError> {
    match arg {
        Some(arg) => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
        None => Ok(parsed),
    }
}

/// Parse user input into a special command
///
/// # Arguments
///
/// * `input` - The user input string to parse
///
/// # Returns
///
/// Returns the parsed SpecialCommand, or SpecialCommand::None if the input
/// is regular prompt text.
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if the input starts with `/` but is
/// not a recognized command.
/// Returns CommandError::MissingArgument if a command requires an argument
/// but none was provided.
/// Returns CommandError::UnsupportedArgument if a command that takes no
/// argument was given one.
///
/// # Examples
///
/// ```
/// use docchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/session 42").unwrap();
/// assert_eq!(cmd, SpecialCommand::SelectSession("42".to_string()));
///
/// let cmd = parse_special_command("what is in the report?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (command, arg) = split_command(trimmed);
    match command.as_str() {
        "/sessions" => no_arg("/sessions", arg, SpecialCommand::ShowSessions),
        "/session" => Ok(SpecialCommand::SelectSession(require_arg(
            "/session",
            arg,
            "/session <session_id>",
        )?)),
        "/new" => no_arg("/new", arg, SpecialCommand::NewChat),

        "/files" => no_arg("/files", arg, SpecialCommand::ShowFiles),
        "/folder" => Ok(SpecialCommand::ToggleFolder(require_arg(
            "/folder",
            arg,
            "/folder <folder_id>",
        )?)),
        "/file" => Ok(SpecialCommand::SelectFile(require_arg(
            "/file",
            arg,
            "/file <file_id>",
        )?)),
        "/clear-file" => no_arg("/clear-file", arg, SpecialCommand::ClearFile),

        "/grow" => no_arg("/grow", arg, SpecialCommand::Grow),
        "/shrink" => no_arg("/shrink", arg, SpecialCommand::Shrink),
        "/hide" => no_arg("/hide", arg, SpecialCommand::Hide),
        "/show" => no_arg("/show", arg, SpecialCommand::Show),

        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help information for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SESSIONS:
  /sessions        - Show or hide the session list
  /session <id>    - Switch to a previous session
  /new             - Start a new, unscoped chat

DOCUMENTS:
  /files           - Show or hide the folder tree
  /folder <id>     - Expand or collapse a folder
  /file <id>       - Chat about a specific document
  /clear-file      - Stop scoping the chat to a document

WINDOW:
  /grow            - Enlarge the widget
  /shrink          - Shrink the widget
  /hide            - Collapse the widget (keeps the conversation)
  /show            - Reopen the widget with a new chat

OTHER COMMANDS:
  /status          - Show current session, document and loading state
  /help            - Show this help message
  exit, quit       - Exit interactive mode

Anything else is sent to the assistant.
"#
    );
}
