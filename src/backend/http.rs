//! HTTP backend for the document assistant API
//!
//! Talks JSON over `reqwest` to the endpoints below, all relative to the
//! configured base URL:
//!
//! | operation          | request                                   |
//! |--------------------|-------------------------------------------|
//! | send with document | `POST chat/withDocument`                  |
//! | send general       | `POST chat/general`                       |
//! | list sessions      | `GET chat/sessions`                       |
//! | session messages   | `GET chat/sessions/{sessionId}/messages`  |
//! | folder listing     | `GET folders?userId=`                     |
//! | folder files       | `GET files/{folderId}/metadata`           |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{ApiResult, ChatBackend};
use crate::config::ApiConfig;
use crate::error::{ApiError, DocChatError, Result};
use crate::model::{Message, SendMessageRequest, Session, TreeNode};

/// Send replies come back as a single record or a list
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Backend that calls the document assistant REST API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a new HTTP backend
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be created
    ///
    /// # Examples
    ///
    /// ```
    /// use docchat::backend::HttpBackend;
    /// use docchat::config::ApiConfig;
    ///
    /// let backend = HttpBackend::new(&ApiConfig::default()).unwrap();
    /// assert_eq!(backend.base_url().as_str(), "http://localhost:8080/api");
    /// ```
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DocChatError::Config(format!("Invalid API base URL {}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocChatError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized HTTP backend: base_url={}", base_url);

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(format!("API base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Backend request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Backend returned error {}: {}", status, body);
            let data = serde_json::from_str(&body).ok();
            return Err(ApiError::from_response(status.as_u16(), data));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse backend response: {}", e);
            ApiError {
                status: Some(status.as_u16()),
                message: format!("Failed to parse response: {}", e),
                data: None,
            }
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, request: &SendMessageRequest) -> ApiResult<Vec<Message>> {
        let path = if request.document_id.is_some() {
            ["chat", "withDocument"]
        } else {
            ["chat", "general"]
        };
        let url = self.endpoint(&path)?;
        tracing::debug!("Sending message to {}", url);

        let reply: OneOrMany<Message> = self
            .execute(self.request(Method::POST, url).json(request))
            .await?;
        Ok(reply.into())
    }

    async fn fetch_sessions(&self) -> ApiResult<Vec<Session>> {
        let url = self.endpoint(&["chat", "sessions"])?;
        let sessions: Option<Vec<Session>> = self.execute(self.request(Method::GET, url)).await?;
        Ok(sessions.unwrap_or_default())
    }

    async fn fetch_session_messages(&self, session_id: &str) -> ApiResult<Vec<Message>> {
        let url = self.endpoint(&["chat", "sessions", session_id, "messages"])?;
        let messages: Option<Vec<Message>> = self.execute(self.request(Method::GET, url)).await?;
        Ok(messages.unwrap_or_default())
    }

    async fn fetch_folders(&self, user_id: Option<&str>) -> ApiResult<Vec<TreeNode>> {
        let mut url = self.endpoint(&["folders"])?;
        if let Some(user_id) = user_id {
            url.query_pairs_mut().append_pair("userId", user_id);
        }
        let tree: Option<Vec<TreeNode>> = self.execute(self.request(Method::GET, url)).await?;
        Ok(tree.unwrap_or_default())
    }

    async fn fetch_folder_files(&self, folder_id: &str) -> ApiResult<Vec<TreeNode>> {
        let url = self.endpoint(&["files", folder_id, "metadata"])?;
        let files: Option<Vec<TreeNode>> = self.execute(self.request(Method::GET, url)).await?;
        Ok(files.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let backend = backend("http://localhost:8080/api");
        let url = backend.endpoint(&["chat", "sessions", "5", "messages"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/chat/sessions/5/messages");
    }

    #[test]
    fn test_endpoint_with_trailing_slash() {
        let backend = backend("http://localhost:8080/api/");
        let url = backend.endpoint(&["folders"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/folders");
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let backend = backend("http://localhost:8080/api");
        let url = backend.endpoint(&["files", "a/b", "metadata"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/files/a%2Fb/metadata");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpBackend::new(&ApiConfig {
            base_url: "::nope".to_string(),
            ..ApiConfig::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));
    }

    #[test]
    fn test_reply_accepts_object_or_list() {
        let one: OneOrMany<Message> =
            serde_json::from_str(r#"{"content": "hi", "isUserMessage": false}"#).unwrap();
        assert_eq!(Vec::from(one).len(), 1);

        let many: OneOrMany<Message> =
            serde_json::from_str(r#"[{"content": "a"}, {"content": "b"}]"#).unwrap();
        assert_eq!(Vec::from(many).len(), 2);
    }
}
