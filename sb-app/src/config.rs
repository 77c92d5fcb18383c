//! Switchboard configuration loader.
//!
//! Everything comes from the process environment, optionally seeded from a
//! dotenv file. Values already present in the environment win over the file.

use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::ChatError;
use crate::fallback::{DEFAULT_FALLBACK_ORDER, parse_fallback_order};
use sb_llm::{GenerationParams, Provider};
use std::path::{Path, PathBuf};

pub const ENV_FILE_VAR: &str = "SWITCHBOARD_ENV_FILE";
pub const FALLBACK_ORDER_VAR: &str = "FALLBACK_ORDER";

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource {
    File(PathBuf),
    ProcessOnly,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub credentials: CredentialStore,
    pub fallback_order: Vec<Provider>,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_max_tokens = GenerationParams::default().max_tokens;
        let mut records = Vec::with_capacity(Provider::ALL.len());

        for provider in Provider::ALL {
            let raw_key = lookup(provider.api_key_var())
                .map(|v| v.trim().to_string())
                .unwrap_or_default();
            let model_id = lookup(provider.model_var())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| provider.default_model().to_string());
            let max_tokens = match lookup(provider.max_tokens_var()) {
                Some(v) if !v.trim().is_empty() => {
                    parse_max_tokens(provider.max_tokens_var(), v.trim())?
                }
                _ => default_max_tokens,
            };
            records.push((provider, CredentialRecord::new(raw_key, model_id, max_tokens)));
        }

        let fallback_raw = lookup(FALLBACK_ORDER_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_ORDER.to_string());

        let cfg = Self {
            credentials: records.into_iter().collect(),
            fallback_order: parse_fallback_order(&fallback_raw)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.credentials.configured().is_empty() {
            return Err(ChatError::Configuration(
                "no LLM API keys configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Verbose-mode summary. Names variables, never their values.
    pub fn log_summary(&self) {
        let configured: Vec<&str> = self
            .credentials
            .configured()
            .into_iter()
            .map(|p| p.api_key_var())
            .collect();
        tracing::debug!(configured_keys = ?configured, "configured api keys");
        for (provider, record) in self.credentials.iter() {
            tracing::debug!(
                provider = %provider,
                model = %record.model_id,
                max_tokens = record.max_tokens,
                "provider settings"
            );
        }
        tracing::debug!(fallback_order = ?self.fallback_order, "fallback order");
    }
}

fn parse_max_tokens(var: &str, value: &str) -> Result<u32, ChatError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ChatError::Configuration(format!(
            "{var} must be a positive integer, got {value:?}"
        ))),
    }
}

pub fn default_env_file() -> PathBuf {
    std::env::var(ENV_FILE_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".env"))
}

/// Load `path` into the process environment. A missing file is only an error
/// when no provider key is set in the environment either.
pub fn load_env_file(path: &Path) -> Result<EnvSource, ChatError> {
    load_env_file_with(path, |key| std::env::var(key).ok())
}

fn load_env_file_with<F>(path: &Path, lookup: F) -> Result<EnvSource, ChatError>
where
    F: Fn(&str) -> Option<String>,
{
    match dotenvy::from_path(path) {
        Ok(()) => Ok(EnvSource::File(path.to_path_buf())),
        Err(e) if e.not_found() => {
            let any_key = Provider::ALL
                .into_iter()
                .any(|p| lookup(p.api_key_var()).is_some_and(|v| !v.trim().is_empty()));
            if any_key {
                Ok(EnvSource::ProcessOnly)
            } else {
                Err(ChatError::Configuration(format!(
                    "could not find {} and no provider API key is set in the environment",
                    path.display()
                )))
            }
        }
        Err(e) => Err(ChatError::Configuration(format!(
            "load {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_only_a_key_is_set() {
        let cfg = ChatConfig::from_lookup(lookup_from(&[("COHERE_API_KEY", " cohere_abc ")]))
            .expect("config loads");
        let cohere = cfg.credentials.get(Provider::Cohere).expect("record");
        assert_eq!(cohere.raw_key, "cohere_abc");
        assert_eq!(cohere.model_id, "command-r-plus");
        assert_eq!(cohere.max_tokens, 1000);
        assert_eq!(
            cfg.credentials.get(Provider::OpenAi).map(|r| r.model_id.as_str()),
            Some("gpt-4o")
        );
        assert_eq!(
            cfg.fallback_order,
            vec![Provider::OpenAi, Provider::Anthropic, Provider::Cohere]
        );
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ChatConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-ant-api-key"),
            ("ANTHROPIC_MODEL", "claude-3-5-sonnet-latest"),
            ("ANTHROPIC_MAX_TOKENS", "2048"),
            ("OPENAI_MODEL", "   "),
            ("FALLBACK_ORDER", "anthropic,openai"),
        ]))
        .expect("config loads");
        let anthropic = cfg.credentials.get(Provider::Anthropic).expect("record");
        assert_eq!(anthropic.model_id, "claude-3-5-sonnet-latest");
        assert_eq!(anthropic.max_tokens, 2048);
        assert_eq!(
            cfg.credentials.get(Provider::OpenAi).map(|r| r.model_id.as_str()),
            Some("gpt-4o")
        );
        assert_eq!(cfg.fallback_order, vec![Provider::Anthropic, Provider::OpenAi]);
    }

    #[test]
    fn no_keys_at_all_is_a_configuration_error() {
        let err = ChatConfig::from_lookup(lookup_from(&[("OPENAI_MODEL", "gpt-4o")]))
            .expect_err("no keys");
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn bad_max_tokens_is_rejected() {
        for bad in ["zero", "0", "-5"] {
            let err = ChatConfig::from_lookup(lookup_from(&[
                ("OPENAI_API_KEY", "sk-x"),
                ("OPENAI_MAX_TOKENS", bad),
            ]))
            .expect_err("bad value");
            assert!(err.to_string().contains("OPENAI_MAX_TOKENS"));
        }
    }

    #[test]
    fn unknown_fallback_token_fails_startup() {
        let err = ChatConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-x"),
            ("FALLBACK_ORDER", "openai,palm"),
        ]))
        .expect_err("palm is unknown");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn existing_env_file_is_reported_as_source() {
        let path = std::env::temp_dir().join(format!("switchboard-env-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "SWITCHBOARD_TEST_ONLY_VAR=1\n").expect("write env file");
        let source = load_env_file(&path).expect("loads");
        assert_eq!(source, EnvSource::File(path.clone()));
        let _ = std::fs::remove_file(path);
    }

    fn missing_env_file() -> PathBuf {
        std::env::temp_dir().join(format!("switchboard-missing-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_env_file_without_keys_is_fatal() {
        let path = missing_env_file();
        for lookup in [lookup_from(&[]), lookup_from(&[("OPENAI_API_KEY", "   ")])] {
            let err = load_env_file_with(&path, lookup).expect_err("no configuration source");
            assert!(matches!(err, ChatError::Configuration(_)));
            assert_eq!(err.exit_code(), 2);
            assert!(err.to_string().contains("could not find"));
        }
    }

    #[test]
    fn missing_env_file_with_a_process_key_continues() {
        let path = missing_env_file();
        let source = load_env_file_with(&path, lookup_from(&[("COHERE_API_KEY", "cohere_x")]))
            .expect("process environment is enough");
        assert_eq!(source, EnvSource::ProcessOnly);
    }
}
