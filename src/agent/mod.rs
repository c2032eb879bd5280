//! Agent Module
//!
//! The LLM collaborator seam used to interpret engine logs.

mod provider;

pub use provider::{LLMProvider, OpenAICompatibleProvider};
