//! Fatal error taxonomy for the chat client.
//!
//! Per-provider and per-turn failures (rejected keys, failed probes, failed
//! turns) are absorbed where they happen and never reach this type.

use sb_llm::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no working LLM provider found (attempted: {})", join_providers(.attempted))]
    FallbackExhausted { attempted: Vec<Provider> },

    #[error("console i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ChatError::Configuration(_) => 2,
            ChatError::FallbackExhausted { .. } => 3,
            ChatError::Io(_) | ChatError::Internal(_) => 1,
        }
    }

    /// Operator-facing next step, printed after the error itself.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            ChatError::Configuration(_) => Some(
                "Configure at least one of OPENAI_API_KEY, ANTHROPIC_API_KEY or COHERE_API_KEY \
                 in .env (or SWITCHBOARD_ENV_FILE) or in the environment.",
            ),
            ChatError::FallbackExhausted { .. } => Some(
                "Every configured provider rejected the connection test; rerun with --debug for \
                 per-provider failure details.",
            ),
            ChatError::Io(_) | ChatError::Internal(_) => None,
        }
    }
}

fn join_providers(providers: &[Provider]) -> String {
    if providers.is_empty() {
        return "none".to_string();
    }
    providers
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
