use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::response::{ApiError, ChatReply, Deleted, MessageDto, MessageList};
use super::AppState;
use crate::chat::{ChatError, ChatRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessagesRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub ids: Vec<i32>,
}

fn owner_id(user_id: Option<String>) -> Result<String, ApiError> {
    user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ApiError::BadRequest("userId is required"))
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected chat request body: {}", e);
        ChatError::Validation
    })?;

    // Detached so a client disconnect cannot stop the pipeline between the
    // user insert and the assistant insert
    let pipeline = state.pipeline.clone();
    let message = tokio::spawn(async move { pipeline.handle(&request).await })
        .await
        .map_err(|e| {
            error!("Chat task failed: {}", e);
            ChatError::Unclassified
        })??;

    Ok(Json(ChatReply { message }))
}

/// GET /api/chat/messages?userId=
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<MessageList>, ApiError> {
    let owner_id = owner_id(query.user_id)?;

    let messages = state.repo.list_messages(&owner_id).await?;
    Ok(Json(MessageList {
        messages: messages.into_iter().map(MessageDto::from).collect(),
    }))
}

/// DELETE /api/chat/messages
pub async fn delete_messages(
    State(state): State<AppState>,
    payload: Result<Json<DeleteMessagesRequest>, JsonRejection>,
) -> Result<Json<Deleted>, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::BadRequest("Invalid request body"))?;
    let owner_id = owner_id(request.user_id)?;
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty"));
    }

    let deleted = state.repo.delete_messages(&owner_id, &request.ids).await?;
    info!("Deleted {} messages for {}", deleted, owner_id);
    Ok(Json(Deleted { deleted }))
}

/// DELETE /api/chat/messages/all?userId=
pub async fn clear_messages(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Deleted>, ApiError> {
    let owner_id = owner_id(query.user_id)?;

    let deleted = state.repo.clear_messages(&owner_id).await?;
    info!("Cleared conversation of {} ({} messages)", owner_id, deleted);
    Ok(Json(Deleted { deleted }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
