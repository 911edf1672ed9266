//! Host environment abstraction.
//!
//! The chat front-end hosting this extension exposes a small surface: the
//! current conversation identity, its ordered turns, a persisted settings blob,
//! and a prompt-injection slot consulted when the host assembles the next
//! generation request. Everything the engine needs from the host goes through
//! the [`ChatHost`] trait; notifications arrive as direct method calls on the
//! engine rather than through the host's own event bus.

use crate::core_types::ChatTurn;
use crate::errors::MemoirError;
use crate::settings::MemoirSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where the injected text lands in the host's prompt assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionPosition {
    Start,
    AfterHistory,
    AuthorNote,
    Jailbreak,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptInjection {
    pub content: String,
    pub position: InjectionPosition,
    pub depth: u32,
    pub scan: bool,
    pub role: InjectionRole,
}

impl PromptInjection {
    /// The summary payload: system role at the start of the prompt, depth 4,
    /// no lorebook scanning. An empty content clears the slot.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            position: InjectionPosition::Start,
            depth: 4,
            scan: false,
            role: InjectionRole::System,
        }
    }
}

#[async_trait]
pub trait ChatHost: Send + Sync {
    /// Display name of the current persona/character.
    fn persona_name(&self) -> String;

    /// Identifier of the current chat, when the host tracks one.
    fn chat_id(&self) -> Option<String>;

    /// Ordered turns of the current conversation.
    fn turns(&self) -> Vec<ChatTurn>;

    /// Register (or clear, for empty content) the system-prompt injection.
    fn set_prompt_injection(&self, injection: PromptInjection);

    /// Persist the settings blob as a whole.
    async fn save_settings(&self, settings: &MemoirSettings) -> Result<(), MemoirError>;
}
