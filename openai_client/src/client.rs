//! Chat completions client

use crate::error::{Error, Result};
use crate::models::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client for `api_base` (e.g. `https://api.openai.com/v1`)
    pub fn new(api_base: &str, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Other("Missing OpenAI API key".to_string()));
        }

        let endpoint = completions_endpoint(api_base)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST /chat/completions
    ///
    /// Returns the decoded body. A response without any completion text is
    /// reported as [`Error::EmptyResponse`].
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(status = status.as_u16(), model = %request.model, "Chat completion response");

        parse_response(status, &text)
    }
}

fn completions_endpoint(api_base: &str) -> Result<Url> {
    // Url::join drops the last path segment unless the base ends with '/'
    let base = if api_base.ends_with('/') {
        api_base.to_string()
    } else {
        format!("{}/", api_base)
    };

    Url::parse(&base)
        .and_then(|u| u.join("chat/completions"))
        .map_err(|e| Error::Other(format!("Invalid API base URL '{}': {}", api_base, e)))
}

pub(crate) fn parse_response(status: StatusCode, text: &str) -> Result<ChatCompletionResponse> {
    if !status.is_success() {
        return Err(api_error(status, text));
    }

    let completion: ChatCompletionResponse = serde_json::from_str(text)?;
    if completion.first_content().is_none() {
        return Err(Error::EmptyResponse);
    }

    Ok(completion)
}

fn api_error(status: StatusCode, text: &str) -> Error {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => Error::Api {
            status: status.as_u16(),
            // Quota errors sometimes only carry the type
            code: body.error.code.or(body.error.kind),
            message: body.error.message,
        },
        Err(_) => Error::Api {
            status: status.as_u16(),
            code: None,
            message: text.to_string(),
        },
    }
}
