//! Typewriter reveal of assistant replies
//!
//! [`TypingAnimator`] owns the one animation task a widget may run. Each
//! animation is a spawned tokio task that appends one character per tick to
//! the shared [`AnimationState`], published through a
//! [`tokio::sync::watch`] channel.
//!
//! # Cancellation
//!
//! Every start and reset bumps a generation counter while holding the watch
//! channel's lock. A tick only applies if the generation it was spawned with
//! is still current, so once [`TypingAnimator::reset`] returns no tick of
//! the cancelled animation can change the state. The task itself is also
//! stopped through a [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AnimationConfig;
use crate::widget::formatter::RenderMessage;

/// Where the animation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationPhase {
    #[default]
    Idle,
    Animating,
    CompletingGrace,
}

/// Observable animation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationState {
    is_typing: bool,
    display_text: String,
    last_animated_message_id: Option<String>,
    phase: AnimationPhase,
    generation: u64,
}

impl AnimationState {
    /// Whether a reveal (or its grace period) is in progress
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Characters revealed so far
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Identity of the last message an animation was started for
    pub fn last_animated_message_id(&self) -> Option<&str> {
        self.last_animated_message_id.as_deref()
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }
}

/// Delays used by a reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    pub initial_delay: Duration,
    pub char_interval: Duration,
    pub grace: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self::from(&AnimationConfig::default())
    }
}

impl From<&AnimationConfig> for AnimationTiming {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            char_interval: config.char_interval(),
            grace: config.grace(),
        }
    }
}

/// Owner of the single in-flight typing animation
///
/// Must be used from within a tokio runtime; starting an animation spawns a
/// task.
#[derive(Debug)]
pub struct TypingAnimator {
    timing: AnimationTiming,
    enabled: bool,
    state: Arc<watch::Sender<AnimationState>>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl TypingAnimator {
    /// Create an idle animator
    ///
    /// # Arguments
    ///
    /// * `timing` - Reveal delays
    /// * `enabled` - When false, triggers only record the message identity
    pub fn new(timing: AnimationTiming, enabled: bool) -> Self {
        let (tx, _rx) = watch::channel(AnimationState::default());
        Self {
            timing,
            enabled,
            state: Arc::new(tx),
            cancel: None,
            handle: None,
        }
    }

    /// Create an animator from configuration
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self::new(AnimationTiming::from(config), config.enabled)
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<AnimationState> {
        self.state.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AnimationState {
        self.state.borrow().clone()
    }

    /// Start an animation for the newest message if it qualifies
    ///
    /// Nothing happens when the list is empty, a request is in flight, the
    /// last message is not from the assistant, or the last message was
    /// already animated.
    ///
    /// # Returns
    ///
    /// Returns true if a new animation was started
    pub fn trigger(&mut self, formatted: &[RenderMessage], loading: bool, pending: bool) -> bool {
        if loading || pending {
            return false;
        }
        let Some(last) = formatted.last() else {
            return false;
        };
        if !last.is_bot() {
            return false;
        }
        if self.state.borrow().last_animated_message_id.as_deref() == Some(last.id.as_str()) {
            return false;
        }

        self.start(&last.id, &last.content);
        true
    }

    /// Start revealing `content`, cancelling any running animation
    pub fn start(&mut self, message_id: &str, content: &str) {
        self.cancel_task();

        let enabled = self.enabled;
        let empty = content.is_empty();
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            generation = s.generation;
            s.last_animated_message_id = Some(message_id.to_string());
            s.display_text.clear();
            if enabled {
                s.is_typing = true;
                s.phase = if empty {
                    AnimationPhase::CompletingGrace
                } else {
                    AnimationPhase::Animating
                };
            } else {
                s.is_typing = false;
                s.phase = AnimationPhase::Idle;
            }
        });

        if !enabled {
            tracing::debug!(message_id, "Animation disabled, recorded message");
            return;
        }

        tracing::debug!(message_id, chars = content.chars().count(), "Starting typing animation");
        let token = CancellationToken::new();
        self.handle = Some(tokio::spawn(run_reveal(
            Arc::clone(&self.state),
            generation,
            content.to_string(),
            self.timing,
            token.clone(),
        )));
        self.cancel = Some(token);
    }

    /// Stop the current animation and clear the revealed text
    ///
    /// A no-op while idle. When this returns, no tick of the cancelled
    /// animation can modify the state.
    pub fn reset(&mut self) {
        self.cancel_task();
        let cleared = self.state.send_if_modified(|s| {
            if s.phase == AnimationPhase::Idle {
                return false;
            }
            s.generation += 1;
            s.is_typing = false;
            s.display_text.clear();
            s.phase = AnimationPhase::Idle;
            true
        });
        if cleared {
            tracing::debug!("Typing animation reset");
        }
    }

    fn cancel_task(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingAnimator {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

/// Sleep for `delay` unless cancelled first
///
/// Returns false when cancelled.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn run_reveal(
    state: Arc<watch::Sender<AnimationState>>,
    generation: u64,
    content: String,
    timing: AnimationTiming,
    cancel: CancellationToken,
) {
    let chars: Vec<char> = content.chars().collect();

    if !chars.is_empty() {
        if !pause(&cancel, timing.initial_delay).await {
            return;
        }

        for (index, ch) in chars.iter().enumerate() {
            let last = index + 1 == chars.len();
            let applied = state.send_if_modified(|s| {
                if s.generation != generation {
                    return false;
                }
                s.display_text.push(*ch);
                if last {
                    s.phase = AnimationPhase::CompletingGrace;
                }
                true
            });
            if !applied {
                return;
            }
            if !last && !pause(&cancel, timing.char_interval).await {
                return;
            }
        }
    }

    if !pause(&cancel, timing.grace).await {
        return;
    }

    state.send_if_modified(|s| {
        if s.generation != generation {
            return false;
        }
        s.is_typing = false;
        s.phase = AnimationPhase::Idle;
        true
    });
}
