//! Chat store
//!
//! A unidirectional state container for the chat widget. Callers dispatch
//! [`ChatAction`]s without waiting for results; the store applies the
//! request phase of each action immediately ([`ChatState::begin`]), runs the
//! backend call as an effect and later applies its [`ChatOutcome`]
//! ([`ChatState::complete`]). Observers read the published [`ChatState`].

pub mod effects;

pub use effects::{spawn_store, Dispatcher};

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::{find_in, find_in_mut, Message, SendMessageRequest, Session, TreeNode};

/// Assistant text used when a send reply carries no assistant message
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request.";

/// Requests understood by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    SendMessage(SendMessageRequest),
    FetchSessions,
    FetchSessionMessages { session_id: String },
    StartNewSession,
    FetchFolders { user_id: Option<String> },
    FetchFolderFiles { folder_id: String },
}

impl ChatAction {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ChatAction::SendMessage(_) => "send_message",
            ChatAction::FetchSessions => "fetch_sessions",
            ChatAction::FetchSessionMessages { .. } => "fetch_session_messages",
            ChatAction::StartNewSession => "start_new_session",
            ChatAction::FetchFolders { .. } => "fetch_folders",
            ChatAction::FetchFolderFiles { .. } => "fetch_folder_files",
        }
    }
}

/// Result of a backend effect
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    MessageSent {
        conversation: u64,
        reply: Vec<Message>,
    },
    SendFailed {
        conversation: u64,
        error: ApiError,
    },
    SessionsLoaded(Vec<Session>),
    SessionsFailed(ApiError),
    SessionMessagesLoaded {
        session_id: String,
        messages: Vec<Message>,
    },
    SessionMessagesFailed {
        session_id: String,
        error: ApiError,
    },
    FoldersLoaded(Vec<TreeNode>),
    FoldersFailed(ApiError),
    FolderFilesLoaded {
        folder_id: String,
        files: Vec<TreeNode>,
    },
    FolderFilesFailed {
        folder_id: String,
        error: ApiError,
    },
}

/// Fetch status of one folder's file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderLoad {
    Loading,
    Loaded,
    Failed,
}

/// Everything the widget renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub sessions: Vec<Session>,
    /// A send or a session-messages fetch is in flight
    pub loading: bool,
    pub loading_sessions: bool,
    pub loading_folders: bool,
    pub current_session_id: Option<String>,
    /// A sent prompt is waiting for its reply
    pub pending_message: bool,
    pub tree: Vec<TreeNode>,
    /// Per-folder file listing status, keyed by folder id
    pub folder_status: HashMap<String, FolderLoad>,
    /// Last failure, cleared when a new request starts
    pub error: Option<ApiError>,
    pub(crate) sending: bool,
    pub(crate) loading_messages: bool,
    pub(crate) conversation: u64,
    pub(crate) applied: u64,
}

impl ChatState {
    /// Counter bumped whenever the visible conversation is replaced
    ///
    /// Send replies tagged with an older value are not appended.
    pub fn conversation(&self) -> u64 {
        self.conversation
    }

    /// Number of actions whose request phase has been applied
    pub fn applied_actions(&self) -> u64 {
        self.applied
    }

    /// Whether a session-messages fetch is in flight
    pub fn is_loading_messages(&self) -> bool {
        self.loading_messages
    }

    /// Status of a folder's file listing
    pub fn folder_load(&self, folder_id: &str) -> Option<FolderLoad> {
        self.folder_status.get(folder_id).copied()
    }

    fn refresh_loading(&mut self) {
        self.loading = self.sending || self.loading_messages;
    }

    /// Apply the request phase of an action
    pub fn begin(&mut self, action: &ChatAction) {
        self.applied += 1;
        self.error = None;
        match action {
            ChatAction::SendMessage(request) => {
                if !request.prompt.is_empty() {
                    let mut optimistic = Message::user(request.prompt.clone())
                        .with_id(format!("tmp-{}", Uuid::new_v4()))
                        .at(Utc::now());
                    optimistic.session_id = request
                        .session_id
                        .clone()
                        .or_else(|| self.current_session_id.clone());
                    self.messages.push(optimistic);
                }
                self.sending = true;
                self.pending_message = true;
            }
            ChatAction::FetchSessions => {
                self.loading_sessions = true;
            }
            ChatAction::FetchSessionMessages { .. } => {
                self.conversation += 1;
                self.messages.clear();
                self.loading_messages = true;
            }
            ChatAction::StartNewSession => {
                self.conversation += 1;
                self.current_session_id = None;
                self.messages.clear();
            }
            ChatAction::FetchFolders { .. } => {
                self.loading_folders = true;
            }
            ChatAction::FetchFolderFiles { folder_id } => {
                self.folder_status
                    .insert(folder_id.clone(), FolderLoad::Loading);
            }
        }
        self.refresh_loading();
    }

    /// Apply the result of an effect
    pub fn complete(&mut self, outcome: ChatOutcome) {
        match outcome {
            ChatOutcome::MessageSent {
                conversation,
                reply,
            } => {
                self.sending = false;
                self.pending_message = false;
                if conversation != self.conversation {
                    tracing::debug!("Dropping reply for a replaced conversation");
                } else {
                    self.append_reply(reply);
                }
            }
            ChatOutcome::SendFailed {
                conversation: _,
                error,
            } => {
                self.sending = false;
                self.pending_message = false;
                self.error = Some(error);
            }
            ChatOutcome::SessionsLoaded(sessions) => {
                self.loading_sessions = false;
                self.sessions = sessions;
            }
            ChatOutcome::SessionsFailed(error) => {
                self.loading_sessions = false;
                self.error = Some(error);
            }
            ChatOutcome::SessionMessagesLoaded {
                session_id,
                messages,
            } => {
                self.loading_messages = false;
                self.messages = messages;
                self.current_session_id = Some(session_id);
            }
            ChatOutcome::SessionMessagesFailed { session_id, error } => {
                tracing::debug!(session_id, "Session messages failed to load");
                self.loading_messages = false;
                self.error = Some(error);
            }
            ChatOutcome::FoldersLoaded(tree) => {
                self.loading_folders = false;
                self.tree = merge_loaded_files(tree, &self.tree);
            }
            ChatOutcome::FoldersFailed(error) => {
                self.loading_folders = false;
                self.error = Some(error);
            }
            ChatOutcome::FolderFilesLoaded { folder_id, files } => {
                match find_in_mut(&mut self.tree, &folder_id) {
                    Some(folder) => {
                        for file in files {
                            if !folder.children.iter().any(|c| c.id == file.id) {
                                folder.children.push(file);
                            }
                        }
                    }
                    None => tracing::warn!(folder_id, "Files loaded for an unknown folder"),
                }
                self.folder_status.insert(folder_id, FolderLoad::Loaded);
            }
            ChatOutcome::FolderFilesFailed { folder_id, error } => {
                self.folder_status.insert(folder_id, FolderLoad::Failed);
                self.error = Some(error);
            }
        }
        self.refresh_loading();
    }

    fn append_reply(&mut self, reply: Vec<Message>) {
        let reply_session = reply.iter().find_map(|m| m.session_id.clone());
        let mut answer = reply
            .into_iter()
            .find(|m| !m.user_message)
            .unwrap_or_else(|| {
                Message::assistant(FALLBACK_REPLY)
                    .with_id(format!("tmp-{}", Uuid::new_v4()))
                    .at(Utc::now())
            });

        let session_id = reply_session.or_else(|| self.current_session_id.clone());
        if answer.session_id.is_none() {
            answer.session_id = session_id.clone();
        }

        if let Some(id) = &session_id {
            if let Some(session) = self.sessions.iter_mut().find(|s| &s.session_id == id) {
                session.messages.push(answer.clone());
            }
        }

        self.messages.push(answer);
        self.current_session_id = session_id;
    }
}

/// Carry already loaded file children over into a fresh folder listing
fn merge_loaded_files(mut fresh: Vec<TreeNode>, previous: &[TreeNode]) -> Vec<TreeNode> {
    fn merge(node: &mut TreeNode, previous: &[TreeNode]) {
        if let Some(old) = find_in(previous, &node.id) {
            for child in old.children.iter().filter(|c| !c.is_folder()) {
                if !node.children.iter().any(|c| c.id == child.id) {
                    node.children.push(child.clone());
                }
            }
        }
        for child in node.children.iter_mut().filter(|c| c.is_folder()) {
            merge(child, previous);
        }
    }

    for node in fresh.iter_mut() {
        merge(node, previous);
    }
    fresh
}
