//! Error types

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Transport failure (connect, timeout, body read)
    Http(reqwest::Error),
    /// Response body could not be decoded
    Json(serde_json::Error),
    /// Non-success status returned by the API
    Api {
        status: u16,
        /// Provider error code, e.g. `rate_limit_exceeded`
        code: Option<String>,
        message: String,
    },
    /// The API answered but produced no completion text
    EmptyResponse,
    /// Invalid configuration or anything else
    Other(String),
}

impl Error {
    /// HTTP status reported by the API, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Provider error code, if the API returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Json(e) => write!(f, "JSON parse error: {}", e),
            Error::Api {
                status,
                code: Some(code),
                message,
            } => write!(f, "API error ({}, {}): {}", status, code, message),
            Error::Api {
                status,
                code: None,
                message,
            } => write!(f, "API error ({}): {}", status, message),
            Error::EmptyResponse => write!(f, "No completion returned"),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
