//! Folder/file selector
//!
//! Expansion state lives here; the tree itself and per-folder fetch status
//! live in the store. File listings are fetched lazily the first time a
//! folder without file children is expanded.

use std::collections::{HashMap, HashSet};

use crate::model::TreeNode;
use crate::store::{ChatAction, FolderLoad};

/// What a rendered line shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeLineKind {
    Folder { expanded: bool, loading: bool },
    File { selected: bool },
}

/// One row of the rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub id: String,
    pub name: String,
    pub kind: TreeLineKind,
}

/// Expansion state of the folder tree
#[derive(Debug, Clone, Default)]
pub struct FileTreeView {
    expanded: HashSet<String>,
}

impl FileTreeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, folder_id: &str) -> bool {
        self.expanded.contains(folder_id)
    }

    /// Expand or collapse a folder
    ///
    /// A folder with children, or whose file fetch finished or failed,
    /// toggles. A childless folder that was never fetched, or whose fetch is
    /// still running, always expands. Expanding a folder with no file
    /// children and no completed or running fetch returns the fetch to
    /// dispatch.
    ///
    /// # Returns
    ///
    /// Returns the file listing request, if one is needed
    pub fn toggle(
        &mut self,
        node: &TreeNode,
        folder_status: &HashMap<String, FolderLoad>,
    ) -> Option<ChatAction> {
        if !node.is_folder() {
            return None;
        }

        let status = folder_status.get(&node.id).copied();
        let loaded = status == Some(FolderLoad::Loaded);
        let settled = loaded || status == Some(FolderLoad::Failed);
        let expand = if node.has_subfolders() || node.has_file_children() || settled {
            !self.is_expanded(&node.id)
        } else {
            true
        };

        if !expand {
            self.expanded.remove(&node.id);
            return None;
        }
        self.expanded.insert(node.id.clone());

        let in_flight = status == Some(FolderLoad::Loading);
        if !loaded && !in_flight && !node.has_file_children() {
            tracing::debug!(folder_id = %node.id, "Requesting folder files");
            return Some(ChatAction::FetchFolderFiles {
                folder_id: node.id.clone(),
            });
        }
        None
    }

    /// Collapse every folder
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Render the visible rows by recursive descent
    pub fn render(
        &self,
        tree: &[TreeNode],
        folder_status: &HashMap<String, FolderLoad>,
        selected_file: Option<&str>,
    ) -> Vec<TreeLine> {
        let mut lines = Vec::new();
        for node in tree {
            self.render_node(node, 0, folder_status, selected_file, &mut lines);
        }
        lines
    }

    fn render_node(
        &self,
        node: &TreeNode,
        depth: usize,
        folder_status: &HashMap<String, FolderLoad>,
        selected_file: Option<&str>,
        lines: &mut Vec<TreeLine>,
    ) {
        if !node.is_folder() {
            lines.push(TreeLine {
                depth,
                id: node.id.clone(),
                name: node.name.clone(),
                kind: TreeLineKind::File {
                    selected: selected_file == Some(node.id.as_str()),
                },
            });
            return;
        }

        let expanded = self.is_expanded(&node.id);
        lines.push(TreeLine {
            depth,
            id: node.id.clone(),
            name: node.name.clone(),
            kind: TreeLineKind::Folder {
                expanded,
                loading: folder_status.get(&node.id) == Some(&FolderLoad::Loading),
            },
        });

        if expanded {
            for child in &node.children {
                self.render_node(child, depth + 1, folder_status, selected_file, lines);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<TreeNode> {
        vec![TreeNode::folder(
            "1",
            "Company",
            vec![
                TreeNode::folder("2", "Invoices", vec![]),
                TreeNode::file("10", "handbook.pdf"),
            ],
        )]
    }

    #[test]
    fn test_collapsed_tree_shows_roots_only() {
        let view = FileTreeView::new();
        let lines = view.render(&tree(), &HashMap::new(), None);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].kind,
            TreeLineKind::Folder {
                expanded: false,
                loading: false
            }
        );
    }

    #[test]
    fn test_expanding_folder_with_files_needs_no_fetch() {
        let mut view = FileTreeView::new();
        let tree = tree();
        assert!(view.toggle(&tree[0], &HashMap::new()).is_none());

        let lines = view.render(&tree, &HashMap::new(), Some("10"));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].depth, 1);
        assert_eq!(lines[2].kind, TreeLineKind::File { selected: true });

        assert!(view.toggle(&tree[0], &HashMap::new()).is_none());
        assert!(!view.is_expanded("1"));
    }

    #[test]
    fn test_expanding_empty_folder_requests_files_once() {
        let mut view = FileTreeView::new();
        let invoices = TreeNode::folder("2", "Invoices", vec![]);
        let mut status = HashMap::new();

        let action = view.toggle(&invoices, &status);
        assert_eq!(
            action,
            Some(ChatAction::FetchFolderFiles {
                folder_id: "2".to_string()
            })
        );

        status.insert("2".to_string(), FolderLoad::Loading);
        assert!(view.toggle(&invoices, &status).is_none());
        assert!(view.is_expanded("2"));
    }

    #[test]
    fn test_loaded_empty_folder_toggles_without_fetch() {
        let mut view = FileTreeView::new();
        let invoices = TreeNode::folder("2", "Invoices", vec![]);
        let status = HashMap::from([("2".to_string(), FolderLoad::Loaded)]);

        assert!(view.toggle(&invoices, &status).is_none());
        assert!(view.is_expanded("2"));
        assert!(view.toggle(&invoices, &status).is_none());
        assert!(!view.is_expanded("2"));
    }

    #[test]
    fn test_failed_folder_can_retry() {
        let mut view = FileTreeView::new();
        let invoices = TreeNode::folder("2", "Invoices", vec![]);
        let status = HashMap::from([("2".to_string(), FolderLoad::Failed)]);
        assert!(view.toggle(&invoices, &status).is_some());
        assert!(view.is_expanded("2"));

        assert!(view.toggle(&invoices, &status).is_none());
        assert!(!view.is_expanded("2"));
    }

    #[test]
    fn test_folder_with_preloaded_files_collapses() {
        let mut view = FileTreeView::new();
        let invoices = TreeNode::folder("2", "Invoices", vec![TreeNode::file("10", "march.pdf")]);

        assert!(view.toggle(&invoices, &HashMap::new()).is_none());
        assert!(view.is_expanded("2"));
        assert!(view.toggle(&invoices, &HashMap::new()).is_none());
        assert!(!view.is_expanded("2"));
    }

    #[test]
    fn test_collapse_all() {
        let mut view = FileTreeView::new();
        let tree = tree();
        view.toggle(&tree[0], &HashMap::new());
        view.collapse_all();
        assert!(!view.is_expanded("1"));
        assert_eq!(view.render(&tree, &HashMap::new(), None).len(), 1);
    }

    #[test]
    fn test_loading_indicator_is_per_folder() {
        let mut view = FileTreeView::new();
        let tree = tree();
        view.toggle(&tree[0], &HashMap::new());
        let status = HashMap::from([("2".to_string(), FolderLoad::Loading)]);

        let lines = view.render(&tree, &status, None);
        assert_eq!(
            lines[0].kind,
            TreeLineKind::Folder {
                expanded: true,
                loading: false
            }
        );
        assert_eq!(
            lines[1].kind,
            TreeLineKind::Folder {
                expanded: false,
                loading: true
            }
        );
    }

    #[test]
    fn test_files_are_not_toggleable() {
        let mut view = FileTreeView::new();
        assert!(view
            .toggle(&TreeNode::file("10", "a.pdf"), &HashMap::new())
            .is_none());
        assert!(!view.is_expanded("10"));
    }
}
