use crate::backend::create_backend;
use crate::commands::speaker_label;
use crate::config::Config;
use crate::error::{DocChatError, Result};
use crate::model::Session;
use crate::widget::format_messages;
use chrono::Local;
use colored::Colorize;
use prettytable::{format, Table};

/// Longest session name shown in the table before truncation
const MAX_NAME_CHARS: usize = 40;

/// Handle `docchat sessions`
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `json` - Print the sessions as JSON instead of a table
///
/// # Errors
///
/// Returns an error if the backend rejects the request
pub async fn handle_sessions(config: &Config, json: bool) -> Result<()> {
    let backend = create_backend(config)?;
    let sessions = backend.fetch_sessions().await?;
    tracing::info!(count = sessions.len(), "Fetched sessions");

    if json {
        let json = serde_json::to_string_pretty(&sessions).map_err(DocChatError::from)?;
        println!("{}", json);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", "No chat sessions found.".yellow());
        return Ok(());
    }

    println!("\nChat Sessions:");
    sessions_table(&sessions).printstd();
    println!();
    println!(
        "Use {} to print a transcript.",
        "docchat history <ID>".cyan()
    );
    println!();
    Ok(())
}

fn truncate(name: &str) -> String {
    if name.chars().count() > MAX_NAME_CHARS {
        let head: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn sessions_table(sessions: &[Session]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Document".bold(),
        "Messages".bold(),
        "Last Message".bold()
    ]);

    for session in sessions {
        let document = session
            .attached_file_name()
            .or_else(|| session.document_id.clone())
            .unwrap_or_else(|| "-".to_string());
        let last = session
            .messages
            .iter()
            .filter_map(|m| m.parsed_timestamp())
            .max()
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![
            session.session_id.cyan(),
            truncate(&session.session_name),
            document,
            session.messages.len(),
            last
        ]);
    }
    table
}

/// Handle `docchat history <session-id>`
///
/// Prints the session's messages in time order.
///
/// # Errors
///
/// Returns [`DocChatError::UnknownSession`] if the backend does not know the
/// session, or the backend error otherwise
pub async fn handle_history(config: &Config, session_id: &str) -> Result<()> {
    let backend = create_backend(config)?;
    let messages = backend
        .fetch_session_messages(session_id)
        .await
        .map_err(|e| match e.status {
            Some(404) => DocChatError::UnknownSession(session_id.to_string()),
            _ => DocChatError::Api(e),
        })?;

    let formatted = format_messages(&messages, Some(session_id));
    if formatted.is_empty() {
        println!(
            "{}",
            format!("No messages found for session {}.", session_id).yellow()
        );
        return Ok(());
    }

    println!("\n{} {}\n", "Session".bold(), session_id.cyan());
    for message in &formatted {
        println!("{} {}", speaker_label(message.kind, message.timestamp), message.content);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(50);
        let shown = truncate(&long);
        assert_eq!(shown.chars().count(), MAX_NAME_CHARS);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_sessions_table_has_header_and_rows() {
        let mut session = Session::new("7", "Chat with: report.pdf (3)").with_document("55");
        session.messages = vec![Message::user("hi").at("2025-03-01T10:00:00Z".parse().unwrap())];
        let table = sessions_table(&[session, Session::new("8", "General chat")]);
        assert_eq!(table.len(), 3);

        let rendered = table.to_string();
        assert!(rendered.contains("report.pdf"));
        assert!(rendered.contains("General chat"));
    }

    #[tokio::test]
    async fn test_history_of_unknown_session_fails() {
        let config = Config::default();
        let err = handle_history(&config, "missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DocChatError>(),
            Some(DocChatError::UnknownSession(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_sessions_json_on_memory_backend() {
        assert!(handle_sessions(&Config::default(), true).await.is_ok());
    }
}
