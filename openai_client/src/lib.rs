//! OpenAI chat completions client
//!
//! A small wrapper around the `/chat/completions` endpoint of any
//! OpenAI-compatible API. Only the request and response fields this
//! project uses are modelled.

mod client;
mod error;
mod models;

pub use client::{OpenAiClient, DEFAULT_API_BASE};
pub use error::{Error, Result};
pub use models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, Choice};
