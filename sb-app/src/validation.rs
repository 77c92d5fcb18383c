//! Offline credential shape checks.
//!
//! Nothing here touches the network: a key that passes may still be refused
//! by the vendor, which is what the initialization probe is for.

use crate::credentials::{CredentialRecord, CredentialStore};
use sb_llm::Provider;
use std::fmt;

pub const PLACEHOLDER_PREFIX: &str = "your-";
pub const MIN_KEY_LEN: usize = 30;

const OPENAI_PREFIX: &str = "sk-";
const OPENAI_PROJECT_PREFIX: &str = "sk-proj-";
const OPENAI_LEGACY_LEN: usize = 51;
const ANTHROPIC_PREFIX: &str = "sk-ant-api";
const COHERE_PREFIX: &str = "cohere_";
const COHERE_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRejection {
    Empty,
    Placeholder,
    TooShort,
    WrongPrefix,
    WrongLength,
}

impl fmt::Display for KeyRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyRejection::Empty => "key is empty",
            KeyRejection::Placeholder => "key is a template placeholder",
            KeyRejection::TooShort => "key is shorter than 30 characters",
            KeyRejection::WrongPrefix => "key does not have the provider's prefix",
            KeyRejection::WrongLength => "key does not have the provider's expected length",
        };
        f.write_str(s)
    }
}

pub fn verdict(provider: Provider, record: &CredentialRecord) -> Result<(), KeyRejection> {
    let key = record.clean_key();
    if key.is_empty() {
        return Err(KeyRejection::Empty);
    }
    if key.starts_with(PLACEHOLDER_PREFIX) {
        return Err(KeyRejection::Placeholder);
    }
    let len = key.chars().count();
    if len < MIN_KEY_LEN {
        return Err(KeyRejection::TooShort);
    }

    match provider {
        Provider::OpenAi => {
            if !key.starts_with(OPENAI_PREFIX) {
                return Err(KeyRejection::WrongPrefix);
            }
            if !key.starts_with(OPENAI_PROJECT_PREFIX) && len != OPENAI_LEGACY_LEN {
                return Err(KeyRejection::WrongLength);
            }
        }
        Provider::Anthropic => {
            if !key.starts_with(ANTHROPIC_PREFIX) {
                return Err(KeyRejection::WrongPrefix);
            }
        }
        Provider::Cohere => {
            if !key.starts_with(COHERE_PREFIX) {
                return Err(KeyRejection::WrongPrefix);
            }
            if len != COHERE_LEN {
                return Err(KeyRejection::WrongLength);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub fn is_valid(provider: Provider, record: &CredentialRecord) -> bool {
    verdict(provider, record).is_ok()
}

/// Providers whose stored key passes validation, in declaration order.
pub fn available_providers(store: &CredentialStore) -> Vec<Provider> {
    let mut out = Vec::new();
    for (provider, record) in store.iter() {
        match verdict(provider, record) {
            Ok(()) => {
                tracing::debug!(provider = %provider, "valid key found");
                out.push(provider);
            }
            Err(reason) => {
                tracing::debug!(provider = %provider, %reason, "provider excluded");
            }
        }
    }
    tracing::debug!(available = ?out, "available providers");
    out
}
