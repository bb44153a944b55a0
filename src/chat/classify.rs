//! Maps provider errors onto the small set of failure kinds the pipeline
//! acts on.

use std::fmt;

/// HTTP status and provider codes that mean "slow down"
const RATE_LIMIT_STATUS: u16 = 429;
const RATE_LIMIT_CODES: &[&str] = &["rate_limit_exceeded", "insufficient_quota"];

/// HTTP status and provider codes that mean "bad credentials"
const AUTH_STATUS: u16 = 401;
const AUTH_CODES: &[&str] = &["invalid_api_key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retryable with backoff
    RateLimited,
    /// Terminal, credentials rejected
    Auth,
    /// Terminal, anything else (transport, decode, empty completion)
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Auth => write!(f, "auth"),
            FailureKind::Other => write!(f, "other"),
        }
    }
}

/// A failed completion call, already classified.
///
/// `status`, `code` and `message` are kept for logging only and never reach
/// the end user.
#[derive(Debug, Clone)]
pub struct CompletionError {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl CompletionError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} completion failure: {}", self.kind, self.message)
    }
}

impl std::error::Error for CompletionError {}

pub fn classify(status: Option<u16>, code: Option<&str>) -> FailureKind {
    let code_in = |codes: &[&str]| code.is_some_and(|c| codes.contains(&c));

    if status == Some(RATE_LIMIT_STATUS) || code_in(RATE_LIMIT_CODES) {
        FailureKind::RateLimited
    } else if status == Some(AUTH_STATUS) || code_in(AUTH_CODES) {
        FailureKind::Auth
    } else {
        FailureKind::Other
    }
}

impl From<openai_client::Error> for CompletionError {
    fn from(err: openai_client::Error) -> Self {
        let status = err.status();
        let code = err.code().map(str::to_string);

        Self {
            kind: classify(status, code.as_deref()),
            status,
            code,
            message: err.to_string(),
        }
    }
}
