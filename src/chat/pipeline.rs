use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::classify::{CompletionError, FailureKind};
use super::error::{ChatError, HIGH_DEMAND_MESSAGE, UNAVAILABLE_MESSAGE, UNEXPECTED_MESSAGE};
use super::retry::RetryPolicy;
use super::store::{CompletionPrompt, CompletionService, MessageStore};
use crate::config::ChatConfig;
use crate::db::types::MessageRole;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl From<&ChatConfig> for PipelineSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: config.retry_policy(),
        }
    }
}

/// Validate → store user message → complete with retries → store reply.
///
/// Once the user message is stored, exactly one assistant message is
/// written for the request: the completion, or one of the fixed fallback
/// texts.
pub struct ChatPipeline {
    store: Arc<dyn MessageStore>,
    completion: Arc<dyn CompletionService>,
    settings: PipelineSettings,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<dyn MessageStore>,
        completion: Arc<dyn CompletionService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            completion,
            settings,
        }
    }

    /// Run one chat request to completion, returning the assistant's reply
    pub async fn handle(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let (message, owner_id) = validate(request)?;

        if let Err(e) = self
            .store
            .insert_message(owner_id, MessageRole::User, message)
            .await
        {
            error!("Failed to store user message for {}: {:#}", owner_id, e);
            return Err(ChatError::Persistence(e));
        }

        let reply = match self.complete_with_retry(message).await {
            Ok(reply) => reply,
            Err(failure) => return Err(self.fail(owner_id, &failure).await),
        };

        match self
            .store
            .insert_message(owner_id, MessageRole::Assistant, &reply)
            .await
        {
            Ok(_) => Ok(reply),
            Err(e) => {
                error!("Failed to store assistant message for {}: {:#}", owner_id, e);
                self.store_fallback(owner_id, UNEXPECTED_MESSAGE).await;
                Err(ChatError::Unclassified)
            }
        }
    }

    async fn complete_with_retry(&self, message: &str) -> Result<String, CompletionError> {
        let policy = self.settings.retry;
        let prompt = CompletionPrompt {
            system_prompt: &self.settings.system_prompt,
            user_message: message,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        for attempt in 0..policy.max_retries {
            info!("Attempt {} of {}", attempt + 1, policy.max_retries);

            let err = match self.completion.complete(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(err) => err,
            };

            error!(
                kind = %err.kind,
                status = ?err.status,
                code = ?err.code,
                "Completion failed: {}",
                err.message
            );

            if err.kind == FailureKind::RateLimited && policy.has_next(attempt) {
                let delay = policy.delay_for(attempt);
                warn!("Waiting {}ms before retry...", delay.as_millis());
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(err);
        }

        Err(CompletionError::other("Maximum retries exceeded"))
    }

    /// Store the fallback reply matching `failure` and build the error
    async fn fail(&self, owner_id: &str, failure: &CompletionError) -> ChatError {
        let (err, text) = match failure.kind {
            FailureKind::RateLimited => (ChatError::RateLimited, HIGH_DEMAND_MESSAGE),
            FailureKind::Auth => {
                error!("Completion service rejected the API key");
                (ChatError::Auth, UNAVAILABLE_MESSAGE)
            }
            FailureKind::Other => (ChatError::Unclassified, UNEXPECTED_MESSAGE),
        };

        self.store_fallback(owner_id, text).await;
        err
    }

    /// Best-effort: a store failure here is logged and otherwise ignored
    async fn store_fallback(&self, owner_id: &str, text: &str) {
        if let Err(e) = self
            .store
            .insert_message(owner_id, MessageRole::Assistant, text)
            .await
        {
            error!("Failed to store error message for {}: {:#}", owner_id, e);
        }
    }
}

/// Both fields must be present and non-blank. Whitespace-only values are
/// rejected too, which is stricter than a plain emptiness check, so no blank
/// entry ever reaches the conversation log.
fn validate(request: &ChatRequest) -> Result<(&str, &str), ChatError> {
    fn non_blank(s: &Option<String>) -> Option<&str> {
        s.as_deref().filter(|v| !v.trim().is_empty())
    }

    match (non_blank(&request.message), non_blank(&request.user_id)) {
        (Some(message), Some(owner_id)) => Ok((message, owner_id)),
        _ => Err(ChatError::Validation),
    }
}
