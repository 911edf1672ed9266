//! Summarization cycle control.
//!
//! The engine decides when to summarize, builds the chained prompt, drives
//! the completion call, feeds the response through the delta parser, and
//! persists/injects the resulting text.

pub mod controller;

pub use controller::MemoryEngine;
