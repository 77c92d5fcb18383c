//! BYO-key LLM client for Switchboard.
//!
//! Pure HTTP client: one non-streaming request per call, vendor wire formats
//! hidden behind [`LlmClient`].

mod anthropic;
mod client;
mod cohere;
mod error;
mod openai;
mod provider;
mod types;

pub use client::{GenerationParams, LlmClient, PROBE_PROMPT};
pub use error::{LlmError, Result};
pub use provider::{ParseProviderError, Provider};
pub use types::{ChatMessage, ChatResponse, Role, Usage};
