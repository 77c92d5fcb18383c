//! Per-provider credentials, built once at startup and read-only afterwards.

use sb_llm::Provider;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Empty means "not configured".
    pub raw_key: String,
    pub model_id: String,
    pub max_tokens: u32,
}

impl CredentialRecord {
    pub fn new(raw_key: impl Into<String>, model_id: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            raw_key: raw_key.into(),
            model_id: model_id.into(),
            max_tokens,
        }
    }

    /// Key with surrounding whitespace and quote characters removed.
    pub fn clean_key(&self) -> &str {
        self.raw_key
            .trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
    }

    pub fn is_configured(&self) -> bool {
        !self.raw_key.trim().is_empty()
    }
}

// Keys never reach logs, including through `{:?}`.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field(
                "raw_key",
                &if self.is_configured() {
                    "<redacted>"
                } else {
                    "<empty>"
                },
            )
            .field("model_id", &self.model_id)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: BTreeMap<Provider, CredentialRecord>,
}

impl CredentialStore {
    pub fn get(&self, provider: Provider) -> Option<&CredentialRecord> {
        self.records.get(&provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Provider, &CredentialRecord)> {
        self.records.iter().map(|(p, r)| (*p, r))
    }

    /// Providers with a non-empty key, valid or not.
    pub fn configured(&self) -> Vec<Provider> {
        self.iter()
            .filter(|(_, r)| r.is_configured())
            .map(|(p, _)| p)
            .collect()
    }
}

impl FromIterator<(Provider, CredentialRecord)> for CredentialStore {
    fn from_iter<T: IntoIterator<Item = (Provider, CredentialRecord)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_key_strips_whitespace_and_quotes() {
        let r = CredentialRecord::new("  \"sk-ant-api-xyz\"\n", "m", 10);
        assert_eq!(r.clean_key(), "sk-ant-api-xyz");
        let r = CredentialRecord::new("'cohere_abc'", "m", 10);
        assert_eq!(r.clean_key(), "cohere_abc");
    }

    #[test]
    fn debug_output_redacts_key() {
        let r = CredentialRecord::new("sk-secret-value", "gpt-4o", 1000);
        let rendered = format!("{r:?}");
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("gpt-4o"));
    }

    #[test]
    fn configured_lists_only_non_empty_keys() {
        let store: CredentialStore = [
            (Provider::OpenAi, CredentialRecord::new("sk-x", "m", 1)),
            (Provider::Anthropic, CredentialRecord::new("   ", "m", 1)),
            (Provider::Cohere, CredentialRecord::new("", "m", 1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.configured(), vec![Provider::OpenAi]);
        assert!(store.get(Provider::Cohere).is_some());
    }
}
