use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_null_default, deserialize_opt_id};

/// Node type string used by the backend for folders
pub const FOLDER_TYPE: &str = "folder";

/// A folder or file in the user's document tree
///
/// Children are owned; there is no back-reference to the parent. Use
/// [`TreeNode::find`] or [`TreeNode::path_to`] when a parent lookup is
/// needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Backend identifier
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub name: String,
    /// `folder` for folders; anything else is treated as a file
    #[serde(rename = "type", default, deserialize_with = "deserialize_null_default")]
    pub node_type: String,
    /// Owned children
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub children: Vec<TreeNode>,
    /// Parent folder reported by file metadata listings
    #[serde(default, deserialize_with = "deserialize_opt_id", skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl TreeNode {
    /// Create a folder node
    pub fn folder(id: impl Into<String>, name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: FOLDER_TYPE.to_string(),
            children,
            folder_id: None,
        }
    }

    /// Create a file node
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: "pdf".to_string(),
            children: Vec::new(),
            folder_id: None,
        }
    }

    /// Whether this node is a folder
    pub fn is_folder(&self) -> bool {
        self.node_type == FOLDER_TYPE
    }

    /// Whether any direct child is a file
    pub fn has_file_children(&self) -> bool {
        self.children.iter().any(|c| !c.is_folder())
    }

    /// Whether any direct child is a folder
    pub fn has_subfolders(&self) -> bool {
        self.children.iter().any(TreeNode::is_folder)
    }

    /// Depth-first search for a node by id
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Mutable depth-first search for a node by id
    pub fn find_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Ids from this node down to the node with `id`, inclusive
    pub fn path_to(&self, id: &str) -> Option<Vec<String>> {
        if self.id == id {
            return Some(vec![self.id.clone()]);
        }
        self.children.iter().find_map(|c| {
            c.path_to(id).map(|mut rest| {
                rest.insert(0, self.id.clone());
                rest
            })
        })
    }
}

/// Search a forest for a node by id
pub fn find_in<'a>(forest: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    forest.iter().find_map(|n| n.find(id))
}

/// Mutable search of a forest for a node by id
pub fn find_in_mut<'a>(forest: &'a mut [TreeNode], id: &str) -> Option<&'a mut TreeNode> {
    forest.iter_mut().find_map(|n| n.find_mut(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TreeNode> {
        vec![TreeNode::folder(
            "1",
            "Company",
            vec![
                TreeNode::folder("2", "Invoices", vec![TreeNode::file("10", "march.pdf")]),
                TreeNode::file("11", "handbook.pdf"),
            ],
        )]
    }

    #[test]
    fn test_deserialize_backend_folder_listing() {
        let json = r#"[{"id": 1, "name": "Root", "type": "folder", "children": [
            {"id": 7, "name": "a.pdf", "type": "application/pdf", "folderId": 1}
        ]}]"#;
        let tree: Vec<TreeNode> = serde_json::from_str(json).unwrap();
        assert!(tree[0].is_folder());
        assert!(tree[0].has_file_children());
        assert_eq!(tree[0].children[0].folder_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_children_default_to_empty() {
        let node: TreeNode =
            serde_json::from_str(r#"{"id": "x", "name": "Empty", "type": "folder", "children": null}"#)
                .unwrap();
        assert!(node.children.is_empty());
        assert!(!node.has_subfolders());
    }

    #[test]
    fn test_find_nested_file() {
        let tree = sample();
        let found = find_in(&tree, "10").unwrap();
        assert_eq!(found.name, "march.pdf");
        assert!(find_in(&tree, "99").is_none());
    }

    #[test]
    fn test_path_to_nested_node() {
        let tree = sample();
        assert_eq!(
            tree[0].path_to("10"),
            Some(vec!["1".to_string(), "2".to_string(), "10".to_string()])
        );
    }

    #[test]
    fn test_child_kind_helpers() {
        let tree = sample();
        assert!(tree[0].has_subfolders());
        assert!(tree[0].has_file_children());
        assert!(!tree[0].children[0].has_subfolders());
    }
}
