/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`: Interactive chat widget
- `history`: Session listing and transcript printing

Both talk to the backend selected in the configuration. The chat handler
drives a [`ChatWidget`](crate::widget::ChatWidget) over a running store;
the history handlers call the backend directly.
*/

use crate::widget::MessageKind;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;

// Special commands parser for the interactive chat
pub mod special_commands;

// Session listing and transcripts
pub mod history;

/// Colored speaker tag with a local time, e.g. `You [10:02]:`
pub(crate) fn speaker_label(kind: MessageKind, timestamp: DateTime<Utc>) -> String {
    let time = timestamp.with_timezone(&Local).format("%H:%M");
    match kind {
        MessageKind::User => format!("{} [{}]:", "You".cyan().bold(), time),
        MessageKind::Bot => format!("{} [{}]:", "Assistant".green().bold(), time),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Starts the store over the configured backend, opens a [`ChatWidget`]
    //! and runs a readline loop. Plain input is sent as a prompt; slash
    //! commands drive the widget. After every input the handler waits for
    //! the store and the typing animation to settle, printing the reveal as
    //! it happens.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::speaker_label;
    use crate::backend::create_backend;
    use crate::config::Config;
    use crate::error::{DocChatError, Result};
    use crate::store::{spawn_store, ChatState};
    use crate::widget::{AnimationState, ChatWidget, MessageLine, Panel, SessionLine, TreeLine, TreeLineKind};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::collections::HashSet;
    use std::io::Write;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};
    use tokio_util::sync::CancellationToken;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Optional session to open instead of a new chat
    /// * `file` - Optional document id to scope the chat to
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created
    ///
    /// # Examples
    ///
    /// ```
    /// use docchat::commands::chat;
    /// use docchat::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default(), None, None).await?;
    /// ```
    pub async fn run_chat(
        config: Config,
        session: Option<String>,
        file: Option<String>,
    ) -> Result<()> {
        tracing::info!(backend = %config.backend, "Starting interactive chat mode");

        let backend = create_backend(&config)?;
        let cancellation = CancellationToken::new();
        let (dispatcher, state_rx, store_handle) = spawn_store(backend, cancellation.clone());
        let widget = ChatWidget::new(dispatcher, &config.widget, config.user_id.clone());
        let idle_timeout = Duration::from_secs(config.api.timeout_seconds + 1);
        let mut chat = ChatSession::new(widget, state_rx, idle_timeout);

        chat.widget.toggle_visible();
        if let Some(id) = &session {
            chat.widget.select_session(id);
        }
        if let Some(id) = &file {
            chat.widget.scope_to_document(id);
        }

        print_welcome_banner();
        chat.settle().await?;
        chat.render();

        let mut input = LineReader::spawn();

        loop {
            let prompt = format!("{}> ", chat.widget.title());
            let Some(line) = input.read_line(prompt).await else {
                break;
            };

            match line {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status(&chat.widget);
                            continue;
                        }
                        Ok(SpecialCommand::None) => {
                            if !chat.send(trimmed) {
                                continue;
                            }
                        }
                        Ok(command) => {
                            if let Err(e) = chat.apply(command) {
                                eprintln!("{} {}\n", "Error:".red().bold(), e);
                                continue;
                            }
                        }
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    }

                    if let Err(e) = chat.settle().await {
                        eprintln!("{} {}\n", "Error:".red().bold(), e);
                        break;
                    }
                    chat.render();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        chat.widget.shutdown();
        cancellation.cancel();
        if let Err(e) = store_handle.await {
            tracing::warn!("Chat store task ended abnormally: {}", e);
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Widget plus the channels it is fed from
    struct ChatSession {
        widget: ChatWidget,
        state_rx: watch::Receiver<ChatState>,
        animation_rx: watch::Receiver<AnimationState>,
        printer: TranscriptPrinter,
        idle_timeout: Duration,
        last_error: Option<String>,
    }

    impl ChatSession {
        fn new(widget: ChatWidget, state_rx: watch::Receiver<ChatState>, idle_timeout: Duration) -> Self {
            let animation_rx = widget.subscribe_animation();
            Self {
                widget,
                state_rx,
                animation_rx,
                printer: TranscriptPrinter::default(),
                idle_timeout,
                last_error: None,
            }
        }

        /// Send a prompt, returning false if nothing was sent
        fn send(&mut self, text: &str) -> bool {
            if !self.widget.is_visible() {
                println!("{}", "The chat is hidden. Type /show to reopen it.".yellow());
                return false;
            }
            self.widget.set_prompt(text);
            if !self.widget.send_message() {
                println!("{}", "Still waiting for the previous reply.".yellow());
                return false;
            }
            true
        }

        fn apply(&mut self, command: SpecialCommand) -> Result<()> {
            tracing::debug!(?command, "Applying special command");
            match command {
                SpecialCommand::ShowSessions => self.widget.toggle_sessions_panel(),
                SpecialCommand::SelectSession(id) => self.widget.select_session(&id),
                SpecialCommand::NewChat => self.widget.start_new_chat(),
                SpecialCommand::ShowFiles => self.widget.toggle_file_tree(),
                SpecialCommand::ToggleFolder(id) => {
                    self.widget.toggle_folder(&id)?;
                    if !self.widget.is_file_tree_open() {
                        self.widget.toggle_file_tree();
                    }
                }
                SpecialCommand::SelectFile(id) => self.widget.select_file(&id)?,
                SpecialCommand::ClearFile => self.widget.clear_selected_file(),
                SpecialCommand::Grow => {
                    if !self.widget.grow() {
                        println!("{}", "Already at the largest size.".yellow());
                    }
                }
                SpecialCommand::Shrink => {
                    if !self.widget.shrink() {
                        println!("{}", "Already at the default size.".yellow());
                    }
                }
                SpecialCommand::Hide => self.widget.collapse(),
                SpecialCommand::Show => {
                    if !self.widget.is_visible() {
                        self.widget.toggle_visible();
                    }
                }
                SpecialCommand::ShowStatus
                | SpecialCommand::Help
                | SpecialCommand::Exit
                | SpecialCommand::None => {}
            }
            Ok(())
        }

        /// Follow state and animation changes until nothing is in flight
        ///
        /// Gives up quietly if nothing changes for the idle timeout.
        async fn settle(&mut self) -> Result<()> {
            loop {
                self.print_transcript();
                if self.widget.is_settled() {
                    return Ok(());
                }

                let state_rx = &mut self.state_rx;
                let animation_rx = &mut self.animation_rx;
                let changed = tokio::time::timeout(self.idle_timeout, async {
                    tokio::select! {
                        changed = state_rx.changed() => changed.map(|_| true),
                        changed = animation_rx.changed() => changed.map(|_| false),
                    }
                })
                .await;

                match changed {
                    Ok(Ok(true)) => {
                        let state = self.state_rx.borrow_and_update().clone();
                        self.widget.sync(&state);
                    }
                    Ok(Ok(false)) => {}
                    Ok(Err(_)) => return Err(DocChatError::StoreClosed.into()),
                    Err(_) => {
                        tracing::warn!("No progress for {:?}, returning to the prompt", self.idle_timeout);
                        println!("{}", "Still waiting for the backend...".yellow());
                        return Ok(());
                    }
                }
            }
        }

        fn print_transcript(&mut self) {
            let chunk = self.printer.update(&self.widget);
            if !chunk.is_empty() {
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
            }
        }

        /// Print the current panel and any new error
        fn render(&mut self) {
            let frame = self.widget.frame();
            match &frame.panel {
                Panel::Hidden => {
                    println!("{}", "Chat hidden. Type /show to reopen it.".dimmed());
                }
                Panel::Sessions { loading, sessions } => {
                    print!("{}", render_sessions(*loading, sessions));
                }
                Panel::FileTree { loading, lines } => {
                    print!("{}", render_tree(*loading, lines));
                }
                Panel::Conversation { .. } => self.print_transcript(),
            }

            if frame.error != self.last_error {
                if let Some(error) = &frame.error {
                    eprintln!("{} {}", "Error:".red().bold(), error);
                }
                self.last_error = frame.error;
            }
        }
    }

    /// Incrementally prints the conversation, revealing the typing message
    /// character by character
    #[derive(Debug, Default)]
    pub(crate) struct TranscriptPrinter {
        conversation: Option<u64>,
        welcomed: bool,
        printed: HashSet<String>,
        /// Id of the message being revealed and the characters printed
        typing: Option<(String, usize)>,
    }

    impl TranscriptPrinter {
        /// Text to print since the previous update
        pub(crate) fn update(&mut self, widget: &ChatWidget) -> String {
            let mut out = String::new();

            let conversation = widget.state().conversation();
            if self.conversation != Some(conversation) {
                if self.typing.take().is_some() {
                    out.push('\n');
                }
                self.conversation = Some(conversation);
                self.welcomed = false;
                self.printed.clear();
                out.push_str(&format!("\n{}\n", format!("── {} ──", widget.title()).bold()));
            }

            let Panel::Conversation { welcome, lines, .. } = widget.frame().panel else {
                return out;
            };

            if let Some(welcome) = welcome {
                if !self.welcomed {
                    self.welcomed = true;
                    out.push_str(&format!("{}\n", welcome.dimmed()));
                }
            }

            for line in &lines {
                if self.printed.contains(&line.id) {
                    continue;
                }
                if line.typing {
                    self.reveal(line, &mut out);
                    break;
                }
                match self.typing.take() {
                    Some((id, shown)) if id == line.id => {
                        out.extend(line.text.chars().skip(shown));
                        out.push('\n');
                    }
                    other => {
                        self.typing = other;
                        out.push_str(&format!(
                            "{} {}\n",
                            speaker_label(line.kind, line.timestamp),
                            line.text
                        ));
                    }
                }
                self.printed.insert(line.id.clone());
            }

            out
        }

        fn reveal(&mut self, line: &MessageLine, out: &mut String) {
            let shown = match &self.typing {
                Some((id, shown)) if *id == line.id => *shown,
                _ => {
                    out.push_str(&format!("{} ", speaker_label(line.kind, line.timestamp)));
                    0
                }
            };
            out.extend(line.text.chars().skip(shown));
            let total = line.text.chars().count().max(shown);
            self.typing = Some((line.id.clone(), total));
        }
    }

    /// Reads lines on a dedicated thread so the runtime stays free
    struct LineReader {
        prompts: std::sync::mpsc::Sender<String>,
        lines: mpsc::UnboundedReceiver<std::result::Result<String, ReadlineError>>,
    }

    impl LineReader {
        fn spawn() -> Self {
            let (prompts, prompt_rx) = std::sync::mpsc::channel::<String>();
            let (line_tx, lines) = mpsc::unbounded_channel();

            std::thread::spawn(move || {
                let mut rl = match DefaultEditor::new() {
                    Ok(rl) => rl,
                    Err(e) => {
                        let _ = line_tx.send(Err(e));
                        return;
                    }
                };
                while let Ok(prompt) = prompt_rx.recv() {
                    let line = rl.readline(&prompt);
                    if let Ok(text) = &line {
                        let _ = rl.add_history_entry(text.as_str());
                    }
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
            });

            Self { prompts, lines }
        }

        async fn read_line(
            &mut self,
            prompt: String,
        ) -> Option<std::result::Result<String, ReadlineError>> {
            self.prompts.send(prompt).ok()?;
            self.lines.recv().await
        }
    }

    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║             DocChat Interactive Chat - Welcome!              ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display the current session, document and widget state
    fn print_status(widget: &ChatWidget) {
        let state = widget.state();
        let size = widget.frame().size;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                        DocChat Status                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Title:     {}", widget.title().bold());
        println!(
            "Session:   {}",
            widget.selected_session_id().unwrap_or("(new chat)").cyan()
        );
        match (widget.selected_file_id(), widget.selected_file_name()) {
            (Some(id), Some(name)) => println!("Document:  {} ({})", name, id.cyan()),
            (Some(id), None) => println!("Document:  {}", id.cyan()),
            _ => println!("Document:  (none)"),
        }
        println!("Messages:  {}", state.messages.len());
        println!("Sessions:  {}", state.sessions.len());
        println!("Window:    {:.0} x {:.0}", size.width, size.height);
        if widget.is_stale() {
            println!("{}", "Session list is out of date".yellow());
        }
        println!();
    }

    pub(crate) fn render_sessions(loading: bool, sessions: &[SessionLine]) -> String {
        let mut out = format!("\n{}\n", "Sessions".bold());
        if loading && sessions.is_empty() {
            out.push_str(&format!("{}\n", "Loading sessions...".dimmed()));
            return out;
        }
        if sessions.is_empty() {
            out.push_str(&format!("{}\n", "No sessions found.".yellow()));
            return out;
        }
        for session in sessions {
            let marker = if session.active { "*" } else { " " };
            out.push_str(&format!(
                "{} {}  {}\n",
                marker,
                session.session_id.cyan(),
                session.name
            ));
            if !session.preview.is_empty() {
                out.push_str(&format!("      {}\n", session.preview.dimmed()));
            }
        }
        out.push_str("Use /session <id> to open one.\n");
        out
    }

    pub(crate) fn render_tree(loading: bool, lines: &[TreeLine]) -> String {
        let mut out = format!("\n{}\n", "Files".bold());
        if loading && lines.is_empty() {
            out.push_str(&format!("{}\n", "Loading folders...".dimmed()));
            return out;
        }
        if lines.is_empty() {
            out.push_str(&format!("{}\n", "No folders found.".yellow()));
            return out;
        }
        for line in lines {
            let indent = "  ".repeat(line.depth);
            match line.kind {
                TreeLineKind::Folder { expanded, loading } => {
                    let arrow = if expanded { "▾" } else { "▸" };
                    let suffix = if loading { " (loading...)" } else { "" };
                    out.push_str(&format!(
                        "{}{} {} [{}]{}\n",
                        indent,
                        arrow,
                        line.name.bold(),
                        line.id.cyan(),
                        suffix.dimmed()
                    ));
                }
                TreeLineKind::File { selected } => {
                    let name = if selected {
                        line.name.green().bold()
                    } else {
                        line.name.normal()
                    };
                    out.push_str(&format!("{}  {} [{}]\n", indent, name, line.id.cyan()));
                }
            }
        }
        out.push_str("Use /folder <id> to expand, /file <id> to chat about a file.\n");
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::config::WidgetConfig;
        use crate::model::Message;
        use crate::store::{ChatAction, ChatOutcome};
        use crate::test_utils::test_dispatcher;

        fn reply_state(session: &str) -> ChatState {
            let mut state = ChatState::default();
            state.begin(&ChatAction::SendMessage(crate::model::SendMessageRequest {
                document_id: None,
                prompt: "hi".to_string(),
                session_id: Some(session.to_string()),
            }));
            state.complete(ChatOutcome::MessageSent {
                conversation: state.conversation(),
                reply: vec![Message::assistant("hello!")
                    .with_id("r1")
                    .in_session(session)],
            });
            state.current_session_id = Some(session.to_string());
            state
        }

        #[tokio::test(start_paused = true)]
        async fn test_printer_reveals_reply_incrementally() {
            let (dispatcher, _rx) = test_dispatcher();
            let mut widget = ChatWidget::new(dispatcher, &WidgetConfig::default(), None);
            widget.toggle_visible();
            widget.select_session("s1");
            let mut printer = TranscriptPrinter::default();

            widget.sync(&reply_state("s1"));
            let first = printer.update(&widget);
            assert!(first.contains("hi"));
            assert!(first.contains("Assistant"));
            assert!(!first.contains("hello"));

            tokio::time::sleep(Duration::from_millis(135)).await;
            let second = printer.update(&widget);
            assert!(second.ends_with("he"));

            tokio::time::sleep(Duration::from_secs(2)).await;
            let rest = printer.update(&widget);
            assert_eq!(rest, "llo!\n");
            assert_eq!(printer.update(&widget), "");
        }

        #[tokio::test]
        async fn test_printer_prints_welcome_once() {
            let (dispatcher, _rx) = test_dispatcher();
            let mut widget = ChatWidget::new(dispatcher, &WidgetConfig::default(), None);
            widget.toggle_visible();
            let mut printer = TranscriptPrinter::default();

            let first = printer.update(&widget);
            assert!(first.contains("Chat with AI"));
            assert!(first.contains("Ask me anything"));
            assert_eq!(printer.update(&widget), "");
        }

        #[test]
        fn test_render_sessions_marks_active() {
            let out = render_sessions(
                false,
                &[SessionLine {
                    session_id: "7".to_string(),
                    name: "General chat".to_string(),
                    preview: "hello".to_string(),
                    active: true,
                }],
            );
            assert!(out.contains("* "));
            assert!(out.contains("General chat"));
            assert!(out.contains("hello"));
        }

        #[test]
        fn test_render_empty_panels() {
            assert!(render_sessions(false, &[]).contains("No sessions found."));
            assert!(render_sessions(true, &[]).contains("Loading sessions..."));
            assert!(render_tree(false, &[]).contains("No folders found."));
        }

        #[test]
        fn test_render_tree_indents_children() {
            let out = render_tree(
                false,
                &[
                    TreeLine {
                        depth: 0,
                        id: "1".to_string(),
                        name: "Company".to_string(),
                        kind: TreeLineKind::Folder {
                            expanded: true,
                            loading: false,
                        },
                    },
                    TreeLine {
                        depth: 1,
                        id: "100".to_string(),
                        name: "handbook.pdf".to_string(),
                        kind: TreeLineKind::File { selected: false },
                    },
                ],
            );
            assert!(out.contains("▾"));
            assert!(out.contains("    handbook.pdf"));
        }
    }
}
