//! Error types for failure handling across the memory pipeline
//!
//! Errors are categorized by their source so that callers can distinguish
//! misconfiguration (abort before any network call) from transport failures and
//! unusable responses. Malformed delta blocks inside an otherwise valid
//! completion are deliberately *not* represented here: the delta parser degrades
//! to pass-through and the summarization cycle still counts as successful.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MemoirError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Completion request failed with status {status}: {body}")]
    Transport { status: u16, body: String },
    #[error("Completion response contained no usable text")]
    EmptyResult,
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("LLM interaction failed: {0}")]
    Llm(String),
    #[error("Settings persistence failed: {0}")]
    Persistence(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MemoirError {
    fn from(err: std::io::Error) -> Self {
        MemoirError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for MemoirError {
    fn from(err: reqwest::Error) -> Self {
        MemoirError::Llm(err.to_string())
    }
}

impl From<serde_json::Error> for MemoirError {
    fn from(err: serde_json::Error) -> Self {
        MemoirError::Parsing(err.to_string())
    }
}
