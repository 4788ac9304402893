//! Session-aware chat widget
//!
//! This module contains the view-state side of the chat client:
//!
//! - [`formatter`] normalizes and orders raw messages
//! - [`animation`] plays the typewriter reveal of assistant replies
//! - [`staleness`] decides when the session list must be refetched
//! - [`resize`] and [`file_tree`] hold window and folder-selector state
//! - [`controller`] composes them into [`ChatWidget`]

pub mod animation;
pub mod controller;
pub mod file_tree;
pub mod formatter;
pub mod resize;
pub mod staleness;

pub use animation::{AnimationPhase, AnimationState, AnimationTiming, TypingAnimator};
pub use controller::{ChatWidget, MessageLine, Panel, SessionLine, WidgetFrame};
pub use file_tree::{FileTreeView, TreeLine, TreeLineKind};
pub use formatter::{format_messages, typing_target, MessageKind, RenderMessage};
pub use resize::{ResizeController, WindowSize};
pub use staleness::{PanelVisibility, RefreshPlan, SessionStalenessTracker};
