//! Chat request pipeline: the only stateful path of the service.

pub mod classify;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod store;

pub use error::ChatError;
pub use pipeline::{ChatPipeline, ChatRequest, PipelineSettings};
pub use store::{MessageStore, OpenAiCompletion};
