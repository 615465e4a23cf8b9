use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use ollama_chat::web_server::{self, WebConfig};
use ollama_chat::{ChatService, LogSink, OllamaClient};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> WebConfig {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    WebConfig {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        templates_dir: root.join("templates"),
        static_dir: root.join("static"),
        title: "DeepSeek R1:1.5B Chatbot".to_string(),
    }
}

fn test_server(ollama_uri: String, log_path: &Path) -> TestServer {
    let client = OllamaClient::new(ollama_uri, Duration::from_secs(5)).unwrap();
    let service = ChatService::new(client, LogSink::new(log_path), "deepseek:1.5b");
    TestServer::new(web_server::router(&config(), service)).unwrap()
}

async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": content}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_index_without_logs_shows_empty_state() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server("http://127.0.0.1:9".to_string(), &temp_dir.path().join("chat_logs.txt"));

    let response = server.get("/").await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("DeepSeek R1:1.5B Chatbot"));
    assert!(body.contains("Chat History"));
    assert!(body.contains("No logs available yet."));
}

#[test_log::test(tokio::test)]
async fn test_chat_post_renders_history_and_recent_logs() {
    let ollama = MockServer::start().await;
    mount_reply(&ollama, "Hello from the model").await;
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_logs.txt");
    let server = test_server(ollama.uri(), &log_path);

    let response = server.post("/chat").form(&[("message", "Hi there")]).await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("Hi there"));
    assert!(body.contains("Hello from the model"));
    assert!(!body.contains("No logs available yet."));
    assert!(body.contains("deepseek:1.5b"));

    // History survives into the next page load.
    let body = server.get("/").await.text();
    assert!(body.contains("Hello from the model"));

    assert_eq!(std::fs::read_to_string(&log_path).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn test_recent_logs_show_last_five_lines() {
    let ollama = MockServer::start().await;
    mount_reply(&ollama, "ok").await;
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_logs.txt");
    let server = test_server(ollama.uri(), &log_path);

    for i in 1..=7 {
        server
            .post("/chat")
            .form(&[("message", format!("question-{}", i))])
            .await
            .assert_status_ok();
    }

    let body = server.get("/").await.text();
    let logs = body.split("Recent Logs").nth(1).unwrap();
    assert!(!logs.contains("question-2 "));
    for i in 3..=7 {
        assert!(logs.contains(&format!("question-{}", i)));
    }
}

#[tokio::test]
async fn test_model_failure_shows_error_banner() {
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&ollama)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_logs.txt");
    let server = test_server(ollama.uri(), &log_path);

    let response = server.post("/chat").form(&[("message", "hi")]).await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("model crashed"));

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let fields: Vec<&str> = contents.lines().next().unwrap().split(" | ").collect();
    assert_eq!(fields[5].trim_end(), "0");
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ollama)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_logs.txt");
    let server = test_server(ollama.uri(), &log_path);

    server
        .post("/chat")
        .form(&[("message", "   ")])
        .await
        .assert_status_ok();
    assert!(!log_path.exists());
}

#[tokio::test]
async fn test_log_write_failure_is_server_error() {
    let ollama = MockServer::start().await;
    mount_reply(&ollama, "ok").await;
    let temp_dir = TempDir::new().unwrap();
    // The log path is a directory, so appending fails.
    let server = test_server(ollama.uri(), temp_dir.path());

    let response = server.post("/chat").form(&[("message", "hi")]).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("Failed to write chat log"));
}

#[tokio::test]
async fn test_static_files_are_served() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server("http://127.0.0.1:9".to_string(), &temp_dir.path().join("chat_logs.txt"));

    let response = server.get("/static/style.css").await;
    response.assert_status_ok();
    assert!(response.text().contains(".message"));
}
