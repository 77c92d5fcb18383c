use std::fmt;
use std::str::FromStr;

/// Vendor identity. Closed set; adding a vendor means a new variant, a key
/// rule in the app's validator and a wire module here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Cohere,
}

impl Provider {
    /// Declaration order, which is also the order providers are listed in.
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Cohere];

    /// Lowercase wire name used in `FALLBACK_ORDER` and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Cohere => "cohere",
        }
    }

    /// Name shown to the operator.
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "Openai",
            Provider::Anthropic => "Anthropic",
            Provider::Cohere => "Cohere",
        }
    }

    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Cohere => "COHERE_API_KEY",
        }
    }

    pub fn model_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_MODEL",
            Provider::Anthropic => "ANTHROPIC_MODEL",
            Provider::Cohere => "COHERE_MODEL",
        }
    }

    pub fn max_tokens_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_MAX_TOKENS",
            Provider::Anthropic => "ANTHROPIC_MAX_TOKENS",
            Provider::Cohere => "COHERE_MAX_TOKENS",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Anthropic => "claude-3-opus-20240229",
            Provider::Cohere => "command-r-plus",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider {0:?}; expected one of: openai, anthropic, cohere")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseProviderError(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        assert_eq!("openai".parse::<Provider>(), Ok(Provider::OpenAi));
        assert_eq!(" Anthropic ".parse::<Provider>(), Ok(Provider::Anthropic));
        assert_eq!("COHERE".parse::<Provider>(), Ok(Provider::Cohere));
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "mistral".parse::<Provider>().expect_err("unknown provider");
        assert_eq!(err, ParseProviderError("mistral".to_string()));
    }

    #[test]
    fn display_matches_wire_name() {
        for p in Provider::ALL {
            assert_eq!(p.to_string(), p.as_str());
            assert_eq!(p.as_str().parse::<Provider>(), Ok(p));
        }
    }
}
