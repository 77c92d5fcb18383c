//! Fallback ordering: which providers to try, and in what order.

use crate::error::ChatError;
use sb_llm::Provider;
use std::collections::BTreeSet;

pub const DEFAULT_FALLBACK_ORDER: &str = "openai,anthropic,cohere";

/// Parse a comma-separated provider list. Blank tokens are ignored; an
/// unknown token is a configuration error.
pub fn parse_fallback_order(raw: &str) -> Result<Vec<Provider>, ChatError> {
    let mut out = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let provider = token
            .parse::<Provider>()
            .map_err(|e| ChatError::Configuration(format!("FALLBACK_ORDER: {e}")))?;
        out.push(provider);
    }
    Ok(out)
}

/// Preferred provider first (when validated), then `configured_order`,
/// skipping duplicates and anything not in `validated`.
pub fn build_plan(
    preferred: Option<Provider>,
    configured_order: &[Provider],
    validated: &BTreeSet<Provider>,
) -> Vec<Provider> {
    let mut plan = Vec::with_capacity(configured_order.len() + 1);
    for provider in preferred.into_iter().chain(configured_order.iter().copied()) {
        if !validated.contains(&provider) || plan.contains(&provider) {
            continue;
        }
        plan.push(provider);
    }
    plan
}
