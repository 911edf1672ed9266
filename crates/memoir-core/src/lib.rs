//! Rolling conversation memory with LLM summarization and character state tracking.
//!
//! This crate maintains a per-conversation memory summary by periodically sending
//! recent chat turns to an OpenAI-compatible completion endpoint and re-injecting
//! the resulting summary into subsequent prompts. Alongside the plain summary it
//! tracks structured numeric character stats: the model is instructed to emit an
//! embedded delta block, which is parsed, merged into persistent per-character
//! state, and rewritten in place as tier-based descriptive text.
//!
//! # Architecture Overview
//!
//! The crate is organized around a few subsystems:
//!
//! - **Summarization cycle**: `MemoryEngine` decides when to summarize, builds the
//!   chained prompt, and persists/injects the result
//! - **Stat tracking**: tier tables, per-conversation character rosters, and the
//!   delta micro-format parser
//! - **Language model integration**: provider-agnostic `LLM` trait with an
//!   OpenAI-compatible HTTP client
//! - **Host integration**: a narrow `ChatHost` trait for reading chat turns,
//!   persisting the settings blob, and registering prompt injections

pub mod core_types;
pub mod errors;
pub mod host;
pub mod llm;
pub mod memory;
pub mod settings;
pub mod stats;
pub mod status_summary;

pub use core_types::{ChatTurn, Message, Role};
pub use errors::MemoirError;
pub use host::{ChatHost, InjectionPosition, InjectionRole, PromptInjection};
pub use llm::{CompletionClient, LLM};
pub use memory::MemoryEngine;
pub use settings::MemoirSettings;
pub use stats::{Character, StatConfiguration, StatDefinition, StateStore, TierRange};
