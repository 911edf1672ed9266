//! Core type definitions for the host-chat and LLM communication boundary
//!
//! These types form the contract between the summarization engine, the chat
//! host, and the completion endpoint. The message shapes follow the OpenAI
//! chat-completions format so any compatible backend can be targeted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
}

/// One rendered turn of the host's chat log.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatTurn {
    pub is_user: bool,
    pub name: String,
    pub text: String,
}

impl ChatTurn {
    /// Display label used when flattening turns into prompt text. User turns
    /// collapse to a generic label; assistant turns carry their display name.
    pub fn speaker_label(&self) -> &str {
        if self.is_user {
            "用户"
        } else if self.name.is_empty() {
            "角色"
        } else {
            &self.name
        }
    }
}
