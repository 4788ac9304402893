//! Session list staleness tracking
//!
//! The cached session list goes stale when the active conversation grows,
//! since the backend may have created or renamed a session. The tracker
//! turns message-count changes and panel visibility transitions into a
//! [`RefreshPlan`] describing which fetches to dispatch.

/// Which parts of the widget are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelVisibility {
    pub widget: bool,
    pub sessions: bool,
    pub file_tree: bool,
}

/// Fetches requested by a visibility transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshPlan {
    pub fetch_sessions: bool,
    pub fetch_folders: bool,
}

impl RefreshPlan {
    /// True when nothing needs fetching
    pub fn is_empty(&self) -> bool {
        !self.fetch_sessions && !self.fetch_folders
    }
}

/// Derives when the session list must be refetched
#[derive(Debug, Clone, Default)]
pub struct SessionStalenessTracker {
    previous_count: usize,
    stale: bool,
    loaded: bool,
    visibility: PanelVisibility,
}

impl SessionStalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current message count
    ///
    /// The list becomes stale when the count grows while a session is
    /// active. A shrinking or unchanged count leaves the flag alone.
    pub fn observe_message_count(&mut self, count: usize, current_session: Option<&str>) {
        if count > self.previous_count && current_session.is_some() {
            if !self.stale {
                tracing::debug!(
                    previous = self.previous_count,
                    count,
                    "Session list marked stale"
                );
            }
            self.stale = true;
        }
        self.previous_count = count;
    }

    /// Reset the count baseline after switching sessions
    pub fn rebaseline(&mut self, count: usize) {
        self.previous_count = count;
    }

    /// Apply new panel visibility and return the fetches to dispatch
    ///
    /// Opening the widget or the sessions panel requests one session fetch
    /// if the list is stale or was never loaded, and clears the flag.
    /// Opening the file tree requests one folder listing.
    pub fn observe_visibility(&mut self, next: PanelVisibility) -> RefreshPlan {
        let previous = self.visibility;
        self.visibility = next;

        let widget_opened = next.widget && !previous.widget;
        let sessions_opened = next.sessions && !previous.sessions;
        let tree_opened = next.file_tree && !previous.file_tree;

        let mut plan = RefreshPlan::default();
        if (widget_opened || sessions_opened) && (self.stale || !self.loaded) {
            plan.fetch_sessions = true;
            self.stale = false;
            self.loaded = true;
        }
        plan.fetch_folders = tree_opened;
        plan
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether a session fetch has been requested at least once
    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    pub fn visibility(&self) -> PanelVisibility {
        self.visibility
    }
}
