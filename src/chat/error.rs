use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Message and userId are required";
pub const HIGH_DEMAND_MESSAGE: &str =
    "AXOM is experiencing high demand. Please try again in a few moments.";
pub const UNAVAILABLE_MESSAGE: &str = "AXOM is currently unavailable. Please contact support.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Terminal outcome of a chat request that did not produce a completion.
///
/// Every variant carries only pre-written text for the caller; details of
/// the underlying failure are logged where they happen.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid chat request")]
    Validation,

    /// The user's message could not be stored, nothing else was attempted
    #[error("Failed to store user message: {0}")]
    Persistence(#[source] anyhow::Error),

    /// Attempts exhausted while the provider kept rate limiting
    #[error("Completion rate limited")]
    RateLimited,

    /// Provider rejected the credentials
    #[error("Completion authentication failed")]
    Auth,

    #[error("Unexpected chat failure")]
    Unclassified,
}

impl ChatError {
    /// Short machine-facing label for the `error` field
    pub fn label(&self) -> &'static str {
        match self {
            ChatError::Validation => VALIDATION_MESSAGE,
            ChatError::Persistence(_) => "Failed to store message",
            ChatError::RateLimited => "OpenAI API rate limit reached",
            ChatError::Auth => "Authentication error",
            ChatError::Unclassified => "Internal server error",
        }
    }

    /// Human-readable text shown to the user and stored as the assistant reply
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ChatError::Validation => None,
            ChatError::Persistence(_) => Some(UNEXPECTED_MESSAGE),
            ChatError::RateLimited => Some(HIGH_DEMAND_MESSAGE),
            ChatError::Auth => Some(UNAVAILABLE_MESSAGE),
            ChatError::Unclassified => Some(UNEXPECTED_MESSAGE),
        }
    }
}
