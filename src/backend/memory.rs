//! In-process backend
//!
//! Keeps sessions and the folder tree in memory and answers every prompt
//! with an echo. Used by the `memory` backend setting and by tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{ApiResult, ChatBackend};
use crate::error::ApiError;
use crate::model::{Message, SendMessageRequest, Session, TreeNode};

#[derive(Debug, Default)]
struct Inner {
    sessions: Vec<Session>,
    tree: Vec<TreeNode>,
    files: HashMap<String, Vec<TreeNode>>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn file_name(&self, document_id: &str) -> Option<String> {
        self.files
            .values()
            .flatten()
            .find(|f| f.id == document_id)
            .map(|f| f.name.clone())
    }
}

/// Backend that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with a small folder tree to chat about
    pub fn with_sample_data() -> Self {
        let tree = vec![TreeNode::folder(
            "1",
            "Company",
            vec![TreeNode::folder("2", "Invoices", Vec::new())],
        )];
        let files = HashMap::from([
            ("1".to_string(), vec![TreeNode::file("100", "handbook.pdf")]),
            (
                "2".to_string(),
                vec![
                    TreeNode::file("200", "march.pdf"),
                    TreeNode::file("201", "april.pdf"),
                ],
            ),
        ]);

        Self {
            inner: Mutex::new(Inner {
                sessions: Vec::new(),
                tree,
                files,
                next_id: 1000,
            }),
            latency: None,
        }
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the folder tree
    pub async fn set_tree(&self, tree: Vec<TreeNode>) {
        self.inner.lock().await.tree = tree;
    }

    /// Register the files listed for a folder
    pub async fn set_folder_files(&self, folder_id: impl Into<String>, files: Vec<TreeNode>) {
        self.inner.lock().await.files.insert(folder_id.into(), files);
    }

    /// Add a session with its messages
    pub async fn insert_session(&self, session: Session) {
        self.inner.lock().await.sessions.push(session);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ChatBackend for MemoryBackend {
    async fn send_message(&self, request: &SendMessageRequest) -> ApiResult<Vec<Message>> {
        self.simulate_latency().await;
        let mut inner = self.inner.lock().await;

        let session_id = match &request.session_id {
            Some(id) if inner.sessions.iter().any(|s| &s.session_id == id) => id.clone(),
            Some(id) => {
                let body = serde_json::json!({ "message": format!("Session {} not found", id) });
                return Err(ApiError::from_response(404, Some(body)));
            }
            None => {
                let id = inner.next_id();
                let name = match request.document_id.as_deref() {
                    Some(doc) => {
                        let file = inner.file_name(doc).unwrap_or_else(|| doc.to_string());
                        format!("Chat with: {} ({})", file, Utc::now().format("%Y-%m-%d"))
                    }
                    None => "General chat".to_string(),
                };
                let mut session = Session::new(id.clone(), name);
                session.document_id = request.document_id.clone();
                inner.sessions.push(session);
                id
            }
        };

        let now = Utc::now();
        let question = Message::user(request.prompt.clone())
            .with_id(inner.next_id())
            .in_session(session_id.clone())
            .at(now);
        let answer = Message::assistant(format!("You said: {}", request.prompt))
            .with_id(inner.next_id())
            .in_session(session_id.clone())
            .at(now);

        if let Some(session) = inner.sessions.iter_mut().find(|s| s.session_id == session_id) {
            session.messages.push(question);
            session.messages.push(answer.clone());
        }

        Ok(vec![answer])
    }

    async fn fetch_sessions(&self) -> ApiResult<Vec<Session>> {
        self.simulate_latency().await;
        Ok(self.inner.lock().await.sessions.clone())
    }

    async fn fetch_session_messages(&self, session_id: &str) -> ApiResult<Vec<Message>> {
        self.simulate_latency().await;
        self.inner
            .lock()
            .await
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| ApiError::from_response(404, None))
    }

    async fn fetch_folders(&self, _user_id: Option<&str>) -> ApiResult<Vec<TreeNode>> {
        self.simulate_latency().await;
        Ok(self.inner.lock().await.tree.clone())
    }

    async fn fetch_folder_files(&self, folder_id: &str) -> ApiResult<Vec<TreeNode>> {
        self.simulate_latency().await;
        let inner = self.inner.lock().await;
        let files = inner.files.get(folder_id).cloned().unwrap_or_default();
        Ok(files
            .into_iter()
            .map(|mut f| {
                f.folder_id = Some(folder_id.to_string());
                f
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_creates_session_and_echoes() {
        let backend = MemoryBackend::new();
        let reply = backend
            .send_message(&SendMessageRequest {
                document_id: None,
                prompt: "hello".to_string(),
                session_id: None,
            })
            .await
            .unwrap();

        assert_eq!(reply.len(), 1);
        assert!(!reply[0].user_message);
        assert_eq!(reply[0].content, "You said: hello");

        let sessions = backend.fetch_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].messages.len(), 2);
        assert_eq!(reply[0].session_id.as_deref(), Some(sessions[0].session_id.as_str()));
    }

    #[tokio::test]
    async fn test_document_session_name_carries_file_name() {
        let backend = MemoryBackend::with_sample_data();
        backend
            .send_message(&SendMessageRequest {
                document_id: Some("200".to_string()),
                prompt: "total?".to_string(),
                session_id: None,
            })
            .await
            .unwrap();

        let sessions = backend.fetch_sessions().await.unwrap();
        assert_eq!(sessions[0].attached_file_name().as_deref(), Some("march.pdf"));
        assert_eq!(sessions[0].document_id.as_deref(), Some("200"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.fetch_session_messages("nope").await.unwrap_err();
        assert_eq!(err.status, Some(404));

        let err = backend
            .send_message(&SendMessageRequest {
                document_id: None,
                prompt: "x".to_string(),
                session_id: Some("nope".to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "Session nope not found");
    }

    #[tokio::test]
    async fn test_folder_files_carry_folder_id() {
        let backend = MemoryBackend::with_sample_data();
        let files = backend.fetch_folder_files("2").await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.folder_id.as_deref() == Some("2")));
        assert!(backend.fetch_folder_files("missing").await.unwrap().is_empty());
    }
}
