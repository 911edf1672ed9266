//! Language model integration.
//!
//! Defines the provider-agnostic `LLM` trait plus an OpenAI-compatible HTTP
//! client. Response extraction is tolerant of the several shapes proxies and
//! alternative backends return for the chat-completions protocol.

pub mod openai;
pub mod response_parser;

use crate::core_types::{LLMResponse, Message};
use crate::errors::MemoirError;
use async_trait::async_trait;

pub use openai::CompletionClient;
pub use response_parser::extract_completion_text;

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(&self, messages: Vec<Message>) -> Result<LLMResponse, MemoirError>;
}
