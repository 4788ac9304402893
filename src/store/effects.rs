//! Store loop and effect runner
//!
//! [`spawn_store`] starts the task that owns the [`ChatState`]. Actions sent
//! through a [`Dispatcher`] are reduced immediately and, where they need the
//! backend, run as spawned effects. Effects are take-latest per kind: a new
//! request aborts the one in flight and a result that is no longer current
//! is discarded. File listings are keyed per folder so different folders
//! load concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ChatAction, ChatOutcome, ChatState};
use crate::backend::ChatBackend;
use crate::error::{DocChatError, Result};

/// Take-latest slot an effect occupies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EffectKey {
    Send,
    Sessions,
    SessionMessages,
    Folders,
    FolderFiles(String),
}

impl EffectKey {
    fn for_action(action: &ChatAction) -> Option<Self> {
        match action {
            ChatAction::SendMessage(_) => Some(EffectKey::Send),
            ChatAction::FetchSessions => Some(EffectKey::Sessions),
            ChatAction::FetchSessionMessages { .. } => Some(EffectKey::SessionMessages),
            ChatAction::StartNewSession => None,
            ChatAction::FetchFolders { .. } => Some(EffectKey::Folders),
            ChatAction::FetchFolderFiles { folder_id } => {
                Some(EffectKey::FolderFiles(folder_id.clone()))
            }
        }
    }
}

struct Completed {
    key: EffectKey,
    seq: u64,
    outcome: ChatOutcome,
}

/// Handle for sending actions to the store
///
/// Cheap to clone. Dispatch never waits for the action's effect.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<ChatAction>,
    dispatched: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Dispatcher paired with a raw action receiver
    ///
    /// For driving a widget without a store loop, e.g. to inspect the
    /// actions it emits.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                dispatched: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Number of actions queued through this dispatcher and its clones
    ///
    /// Compare with [`ChatState::applied_actions`] to tell whether a
    /// published state reflects everything dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Queue an action
    ///
    /// # Errors
    ///
    /// Returns [`DocChatError::StoreClosed`] if the store loop has stopped
    pub fn dispatch(&self, action: ChatAction) -> Result<()> {
        tracing::debug!(action = action.name(), "Dispatching action");
        self.tx
            .send(action)
            .map_err(|_| DocChatError::StoreClosed)?;
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Start the store loop
///
/// # Arguments
///
/// * `backend` - Backend the effects call
/// * `cancellation` - Stops the loop and aborts in-flight effects
///
/// # Returns
///
/// Returns the dispatcher, a receiver of published state and the loop's
/// join handle. The loop also stops once every dispatcher is dropped.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use docchat::backend::MemoryBackend;
/// use docchat::store::{spawn_store, ChatAction};
///
/// #[tokio::main]
/// async fn main() {
///     let token = CancellationToken::new();
///     let (dispatcher, mut state, handle) =
///         spawn_store(Arc::new(MemoryBackend::new()), token.clone());
///     dispatcher.dispatch(ChatAction::FetchSessions).unwrap();
///     state.changed().await.unwrap();
///     token.cancel();
///     handle.await.unwrap();
/// }
/// ```
pub fn spawn_store(
    backend: Arc<dyn ChatBackend>,
    cancellation: CancellationToken,
) -> (Dispatcher, watch::Receiver<ChatState>, JoinHandle<()>) {
    let (dispatcher, action_rx) = Dispatcher::channel();
    let (state_tx, state_rx) = watch::channel(ChatState::default());

    let store = StoreLoop {
        backend,
        state: state_tx,
        in_flight: HashMap::new(),
        next_seq: 0,
    };
    let handle = tokio::spawn(store.run(action_rx, cancellation));

    (dispatcher, state_rx, handle)
}

struct StoreLoop {
    backend: Arc<dyn ChatBackend>,
    state: watch::Sender<ChatState>,
    in_flight: HashMap<EffectKey, (u64, JoinHandle<()>)>,
    next_seq: u64,
}

impl StoreLoop {
    async fn run(
        mut self,
        mut actions: mpsc::UnboundedReceiver<ChatAction>,
        cancellation: CancellationToken,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completed>();

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    tracing::debug!("Chat store cancelled");
                    break;
                }

                Some(completed) = done_rx.recv() => {
                    self.apply(completed);
                }

                maybe_action = actions.recv() => {
                    let Some(action) = maybe_action else {
                        tracing::debug!("All dispatchers dropped, stopping chat store");
                        break;
                    };
                    self.handle_action(action, &done_tx);
                }
            }
        }

        for (_, (_, handle)) in self.in_flight.drain() {
            handle.abort();
        }
    }

    fn handle_action(&mut self, action: ChatAction, done_tx: &mpsc::UnboundedSender<Completed>) {
        self.state.send_modify(|s| s.begin(&action));

        let Some(key) = EffectKey::for_action(&action) else {
            return;
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        let conversation = self.state.borrow().conversation();
        let backend = Arc::clone(&self.backend);
        let done_tx = done_tx.clone();
        let effect_key = key.clone();

        let handle = tokio::spawn(async move {
            if let Some(outcome) = run_effect(backend.as_ref(), action, conversation).await {
                let _ = done_tx.send(Completed {
                    key: effect_key,
                    seq,
                    outcome,
                });
            }
        });

        if let Some((_, previous)) = self.in_flight.insert(key, (seq, handle)) {
            tracing::debug!("Superseding in-flight effect");
            previous.abort();
        }
    }

    fn apply(&mut self, completed: Completed) {
        let current = matches!(
            self.in_flight.get(&completed.key),
            Some((seq, _)) if *seq == completed.seq
        );
        if !current {
            tracing::debug!(key = ?completed.key, "Discarding superseded effect result");
            return;
        }
        self.in_flight.remove(&completed.key);
        self.state.send_modify(|s| s.complete(completed.outcome));
    }
}

async fn run_effect(
    backend: &dyn ChatBackend,
    action: ChatAction,
    conversation: u64,
) -> Option<ChatOutcome> {
    let outcome = match action {
        ChatAction::SendMessage(request) => match backend.send_message(&request).await {
            Ok(reply) => ChatOutcome::MessageSent {
                conversation,
                reply,
            },
            Err(error) => {
                tracing::warn!("Send message failed: {}", error);
                ChatOutcome::SendFailed {
                    conversation,
                    error,
                }
            }
        },
        ChatAction::FetchSessions => match backend.fetch_sessions().await {
            Ok(sessions) => ChatOutcome::SessionsLoaded(sessions),
            Err(error) => {
                tracing::warn!("Fetching sessions failed: {}", error);
                ChatOutcome::SessionsFailed(error)
            }
        },
        ChatAction::FetchSessionMessages { session_id } => {
            match backend.fetch_session_messages(&session_id).await {
                Ok(messages) => ChatOutcome::SessionMessagesLoaded {
                    session_id,
                    messages,
                },
                Err(error) => {
                    tracing::warn!(session_id, "Fetching session messages failed: {}", error);
                    ChatOutcome::SessionMessagesFailed { session_id, error }
                }
            }
        }
        ChatAction::FetchFolders { user_id } => {
            match backend.fetch_folders(user_id.as_deref()).await {
                Ok(tree) => ChatOutcome::FoldersLoaded(tree),
                Err(error) => {
                    tracing::warn!("Fetching folders failed: {}", error);
                    ChatOutcome::FoldersFailed(error)
                }
            }
        }
        ChatAction::FetchFolderFiles { folder_id } => {
            match backend.fetch_folder_files(&folder_id).await {
                Ok(files) => ChatOutcome::FolderFilesLoaded { folder_id, files },
                Err(error) => {
                    tracing::warn!(folder_id, "Fetching folder files failed: {}", error);
                    ChatOutcome::FolderFilesFailed { folder_id, error }
                }
            }
        }
        ChatAction::StartNewSession => return None,
    };
    Some(outcome)
}
