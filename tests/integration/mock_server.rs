//! Mock HTTP server setup for integration tests

use ai_tool_chat::{ClientConfig, OpenAiProvider};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CHAT_PATH: &str = "/chat/completions";
pub const API_KEY: &str = "sk-test";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(API_KEY)
            .with_model("gpt-test")
            .with_base_url(&self.base_url)
            .expect("mock server URL is valid")
    }

    /// Provider pointed at the mock server
    pub fn provider(&self) -> OpenAiProvider {
        OpenAiProvider::new(&self.config()).expect("provider builds")
    }

    /// Mock a successful streaming response (SSE). Each chunk becomes one `data:` frame.
    pub async fn mock_sse_stream(&self, chunks: &[&str]) -> Mock {
        let mut server = self.server.lock().await;
        let body = chunks
            .iter()
            .map(|chunk| {
                if chunk.starts_with("data: ") {
                    format!("{}\n\n", chunk)
                } else {
                    format!("data: {}\n\n", chunk)
                }
            })
            .collect::<Vec<_>>()
            .join("");

        server
            .mock("POST", CHAT_PATH)
            .match_header("authorization", format!("Bearer {API_KEY}").as_str())
            .match_body(Matcher::PartialJsonString(r#"{"stream":true}"#.to_string()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Mock a one-shot JSON response; `body_match` must be contained in the request body.
    pub async fn mock_json_response(
        &self,
        body_match: serde_json::Value,
        status: u16,
        body: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", CHAT_PATH)
            .match_header("authorization", format!("Bearer {API_KEY}").as_str())
            .match_body(Matcher::PartialJson(body_match))
            .with_status(status.into())
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Mock an error response for any request
    pub async fn mock_error_response(&self, status: u16, error_body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", CHAT_PATH)
            .with_status(status.into())
            .with_header("content-type", "application/json")
            .with_body(error_body)
            .create_async()
            .await
    }
}
