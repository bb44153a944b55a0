//! The two collaborators the pipeline talks to.

use anyhow::Result;
use async_trait::async_trait;
use openai_client::{ChatCompletionRequest, ChatMessage, OpenAiClient};

use super::classify::CompletionError;
use crate::db::entities::messages;
use crate::db::repo::Repo;
use crate::db::types::MessageRole;

/// Insert-only view of the conversation log
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(
        &self,
        owner_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<messages::Model>;
}

#[async_trait]
impl MessageStore for Repo {
    async fn insert_message(
        &self,
        owner_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<messages::Model> {
        Repo::insert_message(self, owner_id, role, content).await
    }
}

/// One completion call: fixed instruction plus the user's message
#[derive(Debug, Clone, Copy)]
pub struct CompletionPrompt<'a> {
    pub system_prompt: &'a str,
    pub user_message: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text generation backend. Failures come back already classified.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: CompletionPrompt<'_>) -> Result<String, CompletionError>;
}

/// [`CompletionService`] backed by an OpenAI-compatible API
pub struct OpenAiCompletion {
    client: OpenAiClient,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }

    fn build_request(&self, prompt: CompletionPrompt<'_>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system_prompt),
                ChatMessage::user(prompt.user_message),
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, prompt: CompletionPrompt<'_>) -> Result<String, CompletionError> {
        let request = self.build_request(prompt);
        let response = self.client.create_chat_completion(&request).await?;

        response
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| CompletionError::from(openai_client::Error::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::classify::FailureKind;
    use axum::{
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;

    const PROMPT: CompletionPrompt<'static> = CompletionPrompt {
        system_prompt: "You are AXOM",
        user_message: "Hi",
        temperature: 0.5,
        max_tokens: 500,
    };

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Local `/v1/chat/completions` that answers every call with `status` and
    /// `reply` after `delay`, recording the auth header and body it received
    async fn serve_stub(status: StatusCode, reply: Value, delay: Duration) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorder = seen.clone();

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder.lock().unwrap().push((auth, body));
                    tokio::time::sleep(delay).await;
                    (status, Json(reply))
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        (format!("http://{}/v1", addr), seen)
    }

    fn completion(api_base: &str, timeout: Duration) -> OpenAiCompletion {
        let client = OpenAiClient::new(api_base, "sk-test".to_string(), timeout).unwrap();
        OpenAiCompletion::new(client, "gpt-3.5-turbo".to_string())
    }

    fn error_body(message: &str, kind: &str, code: &str) -> Value {
        json!({ "error": { "message": message, "type": kind, "code": code } })
    }

    #[test]
    fn test_request_shape() {
        let completion = completion("http://localhost:1/v1", Duration::from_secs(30));
        let request = serde_json::to_value(completion.build_request(PROMPT)).unwrap();

        assert_eq!(
            request,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    { "role": "system", "content": "You are AXOM" },
                    { "role": "user", "content": "Hi" }
                ],
                "temperature": 0.5,
                "max_tokens": 500
            })
        );
    }

    #[tokio::test]
    async fn test_complete_sends_request_and_reads_reply() {
        let reply = json!({
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Hello!" }, "finish_reason": "stop" }
            ]
        });
        let (base, seen) = serve_stub(StatusCode::OK, reply, Duration::ZERO).await;

        let text = completion(&base, Duration::from_secs(5))
            .complete(PROMPT)
            .await
            .unwrap();
        assert_eq!(text, "Hello!");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are AXOM");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 500);
    }

    #[tokio::test]
    async fn test_complete_classifies_rate_limit() {
        let body = error_body("Rate limit reached", "requests", "rate_limit_exceeded");
        let (base, _) = serve_stub(StatusCode::TOO_MANY_REQUESTS, body, Duration::ZERO).await;

        let err = completion(&base, Duration::from_secs(5))
            .complete(PROMPT)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::RateLimited);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.code.as_deref(), Some("rate_limit_exceeded"));
    }

    #[tokio::test]
    async fn test_complete_classifies_auth_failure() {
        let body = error_body("Incorrect API key provided", "invalid_request_error", "invalid_api_key");
        let (base, _) = serve_stub(StatusCode::UNAUTHORIZED, body, Duration::ZERO).await;

        let err = completion(&base, Duration::from_secs(5))
            .complete(PROMPT)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Auth);
        assert_eq!(err.status, Some(401));
    }

    #[tokio::test]
    async fn test_complete_timeout_is_other() {
        let reply = json!({ "choices": [] });
        let (base, _) = serve_stub(StatusCode::OK, reply, Duration::from_secs(2)).await;

        let err = completion(&base, Duration::from_millis(100))
            .complete(PROMPT)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Other);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_complete_empty_reply_is_other() {
        let reply = json!({ "choices": [{ "message": { "role": "assistant", "content": "" } }] });
        let (base, _) = serve_stub(StatusCode::OK, reply, Duration::ZERO).await;

        let err = completion(&base, Duration::from_secs(5))
            .complete(PROMPT)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Other);
    }
}
