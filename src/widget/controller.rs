//! Chat widget controller
//!
//! [`ChatWidget`] is the root view-state object. It owns the typing
//! animator, the staleness tracker, the resize state and the file tree
//! expansion, reacts to user intents by dispatching store actions, and is
//! fed every published [`ChatState`] through [`ChatWidget::sync`]. Rendering
//! reads the [`WidgetFrame`] it produces.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::config::WidgetConfig;
use crate::error::{DocChatError, Result};
use crate::model::{find_in, SendMessageRequest};
use crate::store::{ChatAction, ChatState, Dispatcher, FolderLoad};
use crate::widget::animation::{AnimationState, TypingAnimator};
use crate::widget::file_tree::{FileTreeView, TreeLine};
use crate::widget::formatter::{format_messages, typing_target, MessageKind, RenderMessage};
use crate::widget::resize::{ResizeController, WindowSize};
use crate::widget::staleness::{PanelVisibility, SessionStalenessTracker};

/// Title when no session or file is selected
pub const DEFAULT_TITLE: &str = "Chat with AI";

/// Title for a selected session missing from the session list
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// A rendered conversation message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub id: String,
    pub kind: MessageKind,
    /// Full content, or the revealed prefix while typing
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Shows the typing cursor
    pub typing: bool,
}

/// A row of the sessions panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub session_id: String,
    pub name: String,
    pub preview: String,
    pub active: bool,
}

/// What the widget body shows
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Hidden,
    Sessions {
        loading: bool,
        sessions: Vec<SessionLine>,
    },
    FileTree {
        loading: bool,
        lines: Vec<TreeLine>,
    },
    Conversation {
        /// Shown instead of messages when the conversation is empty
        welcome: Option<String>,
        lines: Vec<MessageLine>,
        /// Waiting for the backend
        loading: bool,
    },
}

/// Everything needed to draw the widget once
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetFrame {
    pub title: String,
    pub panel: Panel,
    pub placeholder: String,
    pub input_enabled: bool,
    pub can_send: bool,
    pub size: WindowSize,
    pub error: Option<String>,
}

/// Root view-state controller of the chat widget
#[derive(Debug)]
pub struct ChatWidget {
    dispatcher: Dispatcher,
    user_id: Option<String>,
    animator: TypingAnimator,
    staleness: SessionStalenessTracker,
    resize: ResizeController,
    file_tree: FileTreeView,
    visible: bool,
    show_sessions: bool,
    show_file_tree: bool,
    prompt: String,
    selected_session_id: Option<String>,
    selected_file_id: Option<String>,
    selected_file_name: Option<String>,
    awaiting_new_session: bool,
    baseline_conversation: u64,
    state: ChatState,
    formatted: Vec<RenderMessage>,
}

impl ChatWidget {
    /// Create a hidden widget
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - Store the widget sends actions to
    /// * `config` - Animation timing and window sizing
    /// * `user_id` - Signed-in user, passed to folder listings
    pub fn new(dispatcher: Dispatcher, config: &WidgetConfig, user_id: Option<String>) -> Self {
        Self {
            dispatcher,
            user_id,
            animator: TypingAnimator::from_config(&config.animation),
            staleness: SessionStalenessTracker::new(),
            resize: ResizeController::new(&config.window),
            file_tree: FileTreeView::new(),
            visible: false,
            show_sessions: false,
            show_file_tree: false,
            prompt: String::new(),
            selected_session_id: None,
            selected_file_id: None,
            selected_file_name: None,
            awaiting_new_session: false,
            baseline_conversation: 0,
            state: ChatState::default(),
            formatted: Vec::new(),
        }
    }

    fn dispatch(&self, action: ChatAction) {
        if let Err(e) = self.dispatcher.dispatch(action) {
            tracing::warn!("Dropped widget action: {}", e);
        }
    }

    /// Apply a published store state
    ///
    /// Adopts the session the backend created for a new chat, updates the
    /// staleness baseline, reformats the conversation and runs the typing
    /// trigger.
    pub fn sync(&mut self, state: &ChatState) {
        self.state = state.clone();

        if self.awaiting_new_session && !state.pending_message {
            self.awaiting_new_session = false;
            if self.selected_session_id.is_none() {
                if let Some(id) = &state.current_session_id {
                    tracing::debug!(session_id = %id, "Adopting session created by the backend");
                    self.selected_session_id = Some(id.clone());
                }
            }
        }

        let count = state.messages.len();
        if state.conversation() != self.baseline_conversation {
            self.staleness.rebaseline(count);
            if !state.is_loading_messages() {
                self.baseline_conversation = state.conversation();
            }
        } else {
            self.staleness
                .observe_message_count(count, state.current_session_id.as_deref());
        }

        self.formatted = format_messages(&state.messages, state.current_session_id.as_deref());
        self.animator
            .trigger(&self.formatted, state.loading, state.pending_message);
    }

    fn apply_visibility(&mut self) {
        let plan = self.staleness.observe_visibility(PanelVisibility {
            widget: self.visible,
            sessions: self.visible && self.show_sessions,
            file_tree: self.visible && self.show_file_tree,
        });
        if plan.fetch_sessions {
            self.dispatch(ChatAction::FetchSessions);
        }
        if plan.fetch_folders {
            self.dispatch(ChatAction::FetchFolders {
                user_id: self.user_id.clone(),
            });
        }
    }

    /// Open or close the widget, starting a fresh conversation
    pub fn toggle_visible(&mut self) {
        self.visible = !self.visible;
        self.selected_session_id = None;
        self.animator.reset();
        self.dispatch(ChatAction::StartNewSession);
        if !self.visible {
            self.resize.reset();
        }
        self.apply_visibility();
    }

    /// Hide the widget, keeping the conversation
    pub fn collapse(&mut self) {
        self.visible = false;
        self.resize.reset();
        self.apply_visibility();
    }

    pub fn grow(&mut self) -> bool {
        self.resize.grow()
    }

    pub fn shrink(&mut self) -> bool {
        self.resize.shrink()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Whether input is accepted (no request in flight)
    pub fn input_enabled(&self) -> bool {
        !self.state.loading && !self.state.pending_message
    }

    /// Whether the current prompt can be sent
    pub fn can_send(&self) -> bool {
        self.input_enabled() && !self.prompt.trim().is_empty()
    }

    /// Send the current prompt
    ///
    /// Resets the animation, dispatches the request scoped to the selected
    /// file and session, and clears the prompt.
    ///
    /// # Returns
    ///
    /// Returns false if sending is not allowed right now
    pub fn send_message(&mut self) -> bool {
        if !self.can_send() {
            return false;
        }

        self.animator.reset();
        let request = SendMessageRequest {
            document_id: self.selected_file_id.clone(),
            prompt: std::mem::take(&mut self.prompt),
            session_id: self.selected_session_id.clone(),
        };
        tracing::info!(
            session_id = ?request.session_id,
            document_id = ?request.document_id,
            "Sending message"
        );
        self.awaiting_new_session = request.session_id.is_none();
        self.dispatch(ChatAction::SendMessage(request));

        // Block a second send until the store reports back
        self.state.pending_message = true;
        true
    }

    /// Scope the conversation to a file from the loaded tree
    ///
    /// # Errors
    ///
    /// Returns [`DocChatError::UnknownFile`] if no file with that id is loaded
    pub fn select_file(&mut self, file_id: &str) -> Result<()> {
        let file = find_in(&self.state.tree, file_id)
            .filter(|n| !n.is_folder())
            .ok_or_else(|| DocChatError::UnknownFile(file_id.to_string()))?;

        self.selected_file_id = Some(file.id.clone());
        self.selected_file_name = Some(file.name.clone());
        self.selected_session_id = None;
        self.show_file_tree = false;
        self.apply_visibility();
        Ok(())
    }

    /// Switch to another session
    ///
    /// Selecting the active session only closes the sessions panel.
    pub fn select_session(&mut self, session_id: &str) {
        if self.selected_session_id.as_deref() != Some(session_id) {
            self.animator.reset();
            self.staleness.rebaseline(0);
            self.dispatch(ChatAction::FetchSessionMessages {
                session_id: session_id.to_string(),
            });
            self.selected_session_id = Some(session_id.to_string());

            if let Some(session) = self
                .state
                .sessions
                .iter()
                .find(|s| s.session_id == session_id)
            {
                if let Some(name) = session.attached_file_name() {
                    self.selected_file_name = Some(name);
                    self.selected_file_id = session.document_id.clone();
                }
            }
        }
        self.show_sessions = false;
        self.apply_visibility();
    }

    pub fn toggle_sessions_panel(&mut self) {
        self.show_sessions = !self.show_sessions;
        if self.show_sessions {
            self.show_file_tree = false;
        }
        self.apply_visibility();
    }

    pub fn toggle_file_tree(&mut self) {
        self.show_file_tree = !self.show_file_tree;
        if self.show_file_tree {
            self.show_sessions = false;
        }
        self.apply_visibility();
    }

    /// Expand or collapse a folder, fetching its files when needed
    ///
    /// # Errors
    ///
    /// Returns [`DocChatError::UnknownFolder`] if no folder with that id is
    /// loaded
    pub fn toggle_folder(&mut self, folder_id: &str) -> Result<()> {
        let folder = find_in(&self.state.tree, folder_id)
            .filter(|n| n.is_folder())
            .ok_or_else(|| DocChatError::UnknownFolder(folder_id.to_string()))?;

        if let Some(action) = self.file_tree.toggle(folder, &self.state.folder_status) {
            self.dispatch(action);
        }
        Ok(())
    }

    /// Scope the conversation to a document id that may not be loaded yet
    ///
    /// The display name is taken from the folder tree when the file is
    /// already there.
    pub fn scope_to_document(&mut self, file_id: &str) {
        self.selected_file_name = find_in(&self.state.tree, file_id)
            .filter(|n| !n.is_folder())
            .map(|n| n.name.clone());
        self.selected_file_id = Some(file_id.to_string());
        self.selected_session_id = None;
    }

    /// Drop the file scope
    pub fn clear_selected_file(&mut self) {
        self.selected_file_id = None;
        self.selected_file_name = None;
        self.selected_session_id = None;
    }

    /// Start an empty, unscoped conversation
    pub fn start_new_chat(&mut self) {
        self.animator.reset();
        self.staleness.rebaseline(0);
        self.selected_session_id = None;
        self.selected_file_id = None;
        self.selected_file_name = None;
        self.awaiting_new_session = false;
        self.dispatch(ChatAction::StartNewSession);
        self.show_sessions = false;
        self.apply_visibility();
    }

    /// Header text
    pub fn title(&self) -> String {
        if let Some(id) = &self.selected_session_id {
            return self
                .state
                .sessions
                .iter()
                .find(|s| &s.session_id == id)
                .map(|s| s.session_name.clone())
                .unwrap_or_else(|| NEW_CHAT_TITLE.to_string());
        }
        match &self.selected_file_name {
            Some(name) => format!("Chat with: {}", name),
            None => DEFAULT_TITLE.to_string(),
        }
    }

    /// Input placeholder text
    pub fn placeholder(&self) -> String {
        match (&self.selected_file_id, &self.selected_file_name) {
            (Some(_), Some(name)) => format!("Ask about {}...", name),
            _ => "Ask me anything...".to_string(),
        }
    }

    fn welcome(&self) -> String {
        match (&self.selected_file_id, &self.selected_file_name) {
            (Some(_), Some(name)) => format!("Ask questions about \"{}\"", name),
            _ => "Ask me anything or select a PDF file to chat about specific content".to_string(),
        }
    }

    fn message_lines(&self) -> Vec<MessageLine> {
        let animation = self.animator.snapshot();
        let typing_id = typing_target(&self.formatted, self.selected_session_id.as_deref())
            .filter(|_| animation.is_typing())
            .map(|m| m.id.as_str());

        self.formatted
            .iter()
            .map(|m| {
                let typing = typing_id == Some(m.id.as_str());
                MessageLine {
                    id: m.id.clone(),
                    kind: m.kind,
                    text: if typing {
                        animation.display_text().to_string()
                    } else {
                        m.content.clone()
                    },
                    timestamp: m.timestamp,
                    typing,
                }
            })
            .collect()
    }

    /// Produce the render model
    pub fn frame(&self) -> WidgetFrame {
        let panel = if !self.visible {
            Panel::Hidden
        } else if self.show_sessions {
            Panel::Sessions {
                loading: self.state.loading_sessions,
                sessions: self
                    .state
                    .sessions
                    .iter()
                    .map(|s| SessionLine {
                        session_id: s.session_id.clone(),
                        name: s.session_name.clone(),
                        preview: s.preview(),
                        active: self.selected_session_id.as_deref() == Some(s.session_id.as_str()),
                    })
                    .collect(),
            }
        } else if self.show_file_tree {
            Panel::FileTree {
                loading: self.state.loading_folders,
                lines: self.file_tree.render(
                    &self.state.tree,
                    &self.state.folder_status,
                    self.selected_file_id.as_deref(),
                ),
            }
        } else {
            Panel::Conversation {
                welcome: self.formatted.is_empty().then(|| self.welcome()),
                lines: self.message_lines(),
                loading: self.state.loading || self.state.pending_message,
            }
        };

        WidgetFrame {
            title: self.title(),
            panel,
            placeholder: self.placeholder(),
            input_enabled: self.input_enabled(),
            can_send: self.can_send(),
            size: self.resize.size(),
            error: self.state.error.as_ref().map(|e| e.message.clone()),
        }
    }

    /// Tear down view state
    pub fn shutdown(&mut self) {
        self.animator.reset();
        self.visible = false;
        self.show_sessions = false;
        self.show_file_tree = false;
        self.file_tree.collapse_all();
        self.resize.reset();
    }

    /// Whether the last synced state reflects every dispatched action
    pub fn is_caught_up(&self) -> bool {
        self.state.applied_actions() >= self.dispatcher.dispatched()
    }

    /// Nothing is loading, sending or typing
    pub fn is_settled(&self) -> bool {
        let state = &self.state;
        self.is_caught_up()
            && !state.loading
            && !state.pending_message
            && !state.loading_sessions
            && !state.loading_folders
            && !state
                .folder_status
                .values()
                .any(|s| *s == FolderLoad::Loading)
            && !self.animator.snapshot().is_typing()
    }

    /// Receive typing animation changes
    pub fn subscribe_animation(&self) -> watch::Receiver<AnimationState> {
        self.animator.subscribe()
    }

    pub fn animation(&self) -> AnimationState {
        self.animator.snapshot()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_file_tree_open(&self) -> bool {
        self.visible && self.show_file_tree
    }

    pub fn is_stale(&self) -> bool {
        self.staleness.is_stale()
    }

    pub fn selected_session_id(&self) -> Option<&str> {
        self.selected_session_id.as_deref()
    }

    pub fn selected_file_id(&self) -> Option<&str> {
        self.selected_file_id.as_deref()
    }

    pub fn selected_file_name(&self) -> Option<&str> {
        self.selected_file_name.as_deref()
    }

    /// Last synced store state
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Conversation as formatted on the last sync
    pub fn formatted(&self) -> &[RenderMessage] {
        &self.formatted
    }
}
