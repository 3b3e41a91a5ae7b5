//! Conversational retrieval pipeline: question condensing, retrieval, answer generation.

mod prompt;
mod service;
pub mod types;

pub use service::{ChatApi, ChatService, ChatSettings};
pub use types::{ChatError, ChatOutcome, SourceReference};
