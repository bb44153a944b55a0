use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::chat::ChatError;
use crate::db::entities::messages;
use crate::db::types::MessageRole;

/// `{ error, message? }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// `{ message }`
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i32,
    pub content: String,
    pub role: MessageRole,
    pub user_id: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<messages::Model> for MessageDto {
    fn from(m: messages::Model) -> Self {
        Self {
            id: m.id,
            content: m.content,
            role: m.role,
            user_id: m.owner_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: u64,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::Validation => StatusCode::BAD_REQUEST,
            ChatError::Auth => StatusCode::UNAUTHORIZED,
            ChatError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ChatError::Persistence(_) | ChatError::Unclassified => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.label(),
            message: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors of the conversation management endpoints
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: msg,
                    message: None,
                }),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "Internal server error",
                        message: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}
