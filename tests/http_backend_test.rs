use serde_json::json;
use std::sync::Arc;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docchat::backend::{ChatBackend, HttpBackend};
use docchat::config::ApiConfig;
use docchat::model::SendMessageRequest;
use docchat::store::{spawn_store, ChatAction};
use tokio_util::sync::CancellationToken;

mod common;

fn backend_for(server: &MockServer, token: Option<&str>) -> HttpBackend {
    HttpBackend::new(&ApiConfig {
        base_url: format!("{}/api", server.uri()),
        token: token.map(str::to_string),
        timeout_seconds: 5,
    })
    .unwrap()
}

/// General questions go to chat/general with the bearer token
#[tokio::test]
async fn test_send_general_message_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/general"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"prompt": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageId": 5,
            "sessionId": 9,
            "userMessage": false,
            "content": "hi there",
            "timestamp": "2025-03-01T10:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Some("secret"));
    let reply = backend
        .send_message(&SendMessageRequest {
            document_id: None,
            prompt: "hello".to_string(),
            session_id: None,
        })
        .await
        .unwrap();

    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0].message_id.as_deref(), Some("5"));
    assert_eq!(reply[0].session_id.as_deref(), Some("9"));
    assert_eq!(reply[0].content, "hi there");
}

/// Document-scoped questions go to chat/withDocument and may return a list
#[tokio::test]
async fn test_send_with_document_accepts_list_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/withDocument"))
        .and(body_json(json!({
            "documentId": "200",
            "prompt": "total?",
            "sessionId": "9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"messageId": 6, "sessionId": 9, "userMessage": true, "content": "total?"},
            {"messageId": 7, "sessionId": 9, "userMessage": false, "content": "42 EUR"}
        ])))
        .mount(&server)
        .await;

    let reply = backend_for(&server, None)
        .send_message(&SendMessageRequest {
            document_id: Some("200".to_string()),
            prompt: "total?".to_string(),
            session_id: Some("9".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(reply.len(), 2);
    assert!(reply[0].user_message);
    assert_eq!(reply[1].content, "42 EUR");
}

#[tokio::test]
async fn test_fetch_sessions_and_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sessionId": 3,
            "sessionName": "Chat with: report.pdf (2025-03-01)",
            "documentId": 200,
            "messages": null
        }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/3/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"messageId": 1, "userMessage": true, "content": "hi"}
        ])))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);

    let sessions = backend.fetch_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].document_id.as_deref(), Some("200"));
    assert_eq!(sessions[0].attached_file_name().as_deref(), Some("report.pdf"));
    assert!(sessions[0].messages.is_empty());

    let messages = backend.fetch_session_messages("3").await.unwrap();
    assert_eq!(messages[0].content, "hi");
}

/// A 404 without a body gets the default not-found message
#[tokio::test]
async fn test_missing_session_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/77/messages"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = backend_for(&server, None)
        .fetch_session_messages("77")
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(404));
    assert_eq!(
        err.message,
        "Sorry! the data you are looking for could not be found"
    );
}

/// A message in the error body wins over the default
#[tokio::test]
async fn test_error_body_message_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "database down"})),
        )
        .mount(&server)
        .await;

    let err = backend_for(&server, None).fetch_sessions().await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert_eq!(err.message, "database down");
    assert!(err.data.is_some());
}

#[tokio::test]
async fn test_fetch_folders_passes_user_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/folders"))
        .and(query_param("userId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "name": "Company",
            "type": "folder",
            "children": [{"id": 2, "name": "Invoices", "type": "folder", "children": []}]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let tree = backend_for(&server, None)
        .fetch_folders(Some("42"))
        .await
        .unwrap();

    assert_eq!(tree.len(), 1);
    assert!(tree[0].is_folder());
    assert!(tree[0].has_subfolders());
    assert_eq!(tree[0].children[0].id, "2");
}

#[tokio::test]
async fn test_null_folder_files_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/files/2/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("null", "application/json"))
        .mount(&server)
        .await;

    let files = backend_for(&server, None)
        .fetch_folder_files("2")
        .await
        .unwrap();
    assert!(files.is_empty());
}

/// A failed send surfaces as state error and clears the pending flag
#[tokio::test]
async fn test_store_reflects_http_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/general"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let (dispatcher, mut rx, handle) =
        spawn_store(Arc::new(backend_for(&server, None)), token.clone());

    dispatcher
        .dispatch(ChatAction::SendMessage(SendMessageRequest {
            document_id: None,
            prompt: "hello".to_string(),
            session_id: None,
        }))
        .unwrap();

    let state = common::wait_for_state(&mut rx, |s| s.error.is_some()).await;
    assert!(!state.pending_message);
    assert!(!state.loading);
    assert_eq!(state.error.unwrap().message, "Invalid credentials");
    // The optimistic user message stays
    assert_eq!(state.messages.len(), 1);

    token.cancel();
    handle.await.unwrap();
}
