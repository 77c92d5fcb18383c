//! Provider initialization: walk the fallback plan, probe each candidate
//! once, keep the first one that answers.

use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::ChatError;
use crate::session::ChatBackend;
use crate::validation::{KeyRejection, verdict};
use async_trait::async_trait;
use sb_llm::{GenerationParams, LlmClient, LlmError, Provider};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Builds a client for one provider and proves it works.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: ChatBackend;

    async fn connect(
        &self,
        provider: Provider,
        record: &CredentialRecord,
    ) -> Result<Self::Client, LlmError>;
}

/// Real vendor clients, probed with one minimal request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveConnector;

#[async_trait]
impl Connector for LiveConnector {
    type Client = LlmClient;

    async fn connect(
        &self,
        provider: Provider,
        record: &CredentialRecord,
    ) -> Result<LlmClient, LlmError> {
        let params = GenerationParams {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: record.max_tokens,
        };
        tracing::debug!(
            provider = %provider,
            model = %record.model_id,
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "building provider client"
        );
        let client = LlmClient::new(provider, record.clean_key(), &record.model_id, params);
        client.probe().await?;
        Ok(client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    ModelNotFound,
    RateLimited,
    Other,
}

impl FailureKind {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            FailureKind::Authentication => {
                Some("Invalid API key - please verify your credentials")
            }
            FailureKind::ModelNotFound => Some("Model not found - please verify model name"),
            FailureKind::RateLimited => Some("Rate limit exceeded - please try again later"),
            FailureKind::Other => None,
        }
    }
}

fn kind_for_status(status: u16) -> FailureKind {
    match status {
        401 | 403 => FailureKind::Authentication,
        404 => FailureKind::ModelNotFound,
        429 => FailureKind::RateLimited,
        _ => FailureKind::Other,
    }
}

/// Classify by HTTP status, or by a status code standing as its own token in
/// the error text when the failure carries no structured status.
pub fn classify(err: &LlmError) -> FailureKind {
    if let Some(status) = err.status() {
        return kind_for_status(status);
    }
    let text = err.to_string();
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| match token {
            "401" | "403" | "404" | "429" => token.parse().ok().map(kind_for_status),
            _ => None,
        })
        .unwrap_or(FailureKind::Other)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Skipped(KeyRejection),
    Failed { kind: FailureKind, message: String },
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitAttempt {
    pub provider: Provider,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub attempts: Vec<InitAttempt>,
}

impl InitReport {
    /// Candidates that reached the probe stage.
    pub fn probed(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
            .count()
    }

    fn record(&mut self, provider: Provider, outcome: AttemptOutcome) {
        self.attempts.push(InitAttempt { provider, outcome });
    }
}

pub struct Initialized<C> {
    pub provider: Provider,
    pub client: C,
    pub report: InitReport,
}

#[tracing::instrument(level = "info", skip_all, fields(plan = ?plan))]
pub async fn initialize<C: Connector>(
    plan: &[Provider],
    store: &CredentialStore,
    connector: &C,
) -> Result<Initialized<C::Client>, ChatError> {
    let mut report = InitReport::default();

    for &provider in plan {
        let Some(record) = store.get(provider) else {
            report.record(provider, AttemptOutcome::Skipped(KeyRejection::Empty));
            continue;
        };
        // The plan was built from validated providers; checked again here.
        if let Err(reason) = verdict(provider, record) {
            tracing::debug!(provider = %provider, %reason, "skipping candidate");
            report.record(provider, AttemptOutcome::Skipped(reason));
            continue;
        }

        match connector.connect(provider, record).await {
            Ok(client) => {
                tracing::info!(provider = %provider, model = %record.model_id, "provider initialized");
                report.record(provider, AttemptOutcome::Connected);
                return Ok(Initialized {
                    provider,
                    client,
                    report,
                });
            }
            Err(e) => {
                let kind = classify(&e);
                let mut message = format!("Failed to initialize {provider}: {e}");
                if let Some(hint) = kind.hint() {
                    message.push('\n');
                    message.push_str(hint);
                }
                tracing::warn!(provider = %provider, kind = ?kind, "{message}");
                report.record(provider, AttemptOutcome::Failed { kind, message });
            }
        }
    }

    let attempted = report
        .attempts
        .iter()
        .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
        .map(|a| a.provider)
        .collect();
    tracing::error!(attempts = report.attempts.len(), "no working LLM provider found");
    Err(ChatError::FallbackExhausted { attempted })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sb_llm::{ChatMessage, ChatResponse, Usage};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedSender;

    #[derive(Debug, Clone)]
    pub(crate) struct FakeClient {
        pub provider: Provider,
        pub model: String,
        pub replies: Arc<Mutex<Vec<Result<String, u16>>>>,
    }

    #[async_trait]
    impl ChatBackend for FakeClient {
        fn model(&self) -> &str {
            &self.model
        }

        async fn reply(&self, _messages: &[ChatMessage]) -> sb_llm::Result<ChatResponse> {
            let next = {
                let mut replies = self.replies.lock().expect("replies lock");
                if replies.is_empty() {
                    Ok(format!("reply from {}", self.provider))
                } else {
                    replies.remove(0)
                }
            };
            match next {
                Ok(text) => Ok(ChatResponse {
                    message: ChatMessage::assistant(text),
                    usage: Usage::default(),
                    finish_reason: "stop".to_string(),
                }),
                Err(status) => Err(LlmError::Status {
                    provider: self.provider,
                    status,
                    body: "scripted failure".to_string(),
                }),
            }
        }
    }

    /// Probe results keyed by provider: `None` connects, `Some(status)` fails.
    /// A `stall` provider raises the interrupt and then never answers.
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        pub probes: HashMap<Provider, Option<u16>>,
        pub calls: Mutex<Vec<Provider>>,
        pub replies: Arc<Mutex<Vec<Result<String, u16>>>>,
        pub stall: Option<(Provider, UnboundedSender<()>)>,
    }

    impl FakeConnector {
        pub fn with(probes: &[(Provider, Option<u16>)]) -> Self {
            Self {
                probes: probes.iter().copied().collect(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Provider> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Client = FakeClient;

        async fn connect(
            &self,
            provider: Provider,
            record: &CredentialRecord,
        ) -> Result<FakeClient, LlmError> {
            self.calls.lock().expect("calls lock").push(provider);
            if let Some((stalled, interrupt)) = &self.stall {
                if *stalled == provider {
                    interrupt.send(()).expect("send interrupt");
                    std::future::pending::<()>().await;
                }
            }
            match self.probes.get(&provider).copied().flatten() {
                None => Ok(FakeClient {
                    provider,
                    model: record.model_id.clone(),
                    replies: self.replies.clone(),
                }),
                Some(status) => Err(LlmError::Status {
                    provider,
                    status,
                    body: "probe rejected".to_string(),
                }),
            }
        }
    }

    pub(crate) fn valid_store(providers: &[Provider]) -> CredentialStore {
        providers
            .iter()
            .map(|&p| {
                let key = match p {
                    Provider::OpenAi => format!("sk-{}", "a".repeat(48)),
                    Provider::Anthropic => format!("sk-ant-api03-{}", "b".repeat(40)),
                    Provider::Cohere => format!("cohere_{}", "c".repeat(33)),
                };
                (p, CredentialRecord::new(key, p.default_model(), 1000))
            })
            .collect()
    }

    #[tokio::test]
    async fn first_success_wins_and_later_candidates_are_not_tried() {
        let store = valid_store(&Provider::ALL);
        let connector = FakeConnector::with(&[
            (Provider::OpenAi, Some(429)),
            (Provider::Anthropic, None),
            (Provider::Cohere, None),
        ]);
        let plan = [Provider::OpenAi, Provider::Anthropic, Provider::Cohere];

        let out = initialize(&plan, &store, &connector)
            .await
            .expect("anthropic connects");

        assert_eq!(out.provider, Provider::Anthropic);
        assert_eq!(out.client.provider, Provider::Anthropic);
        assert_eq!(connector.calls(), vec![Provider::OpenAi, Provider::Anthropic]);
        assert_eq!(out.report.probed(), 2);
        match &out.report.attempts[0].outcome {
            AttemptOutcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::RateLimited);
                assert!(message.ends_with("Rate limit exceeded - please try again later"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn earlier_candidate_takes_precedence() {
        let store = valid_store(&Provider::ALL);
        let connector = FakeConnector::with(&[]);
        let out = initialize(&[Provider::Cohere, Provider::OpenAi], &store, &connector)
            .await
            .expect("cohere connects");
        assert_eq!(out.provider, Provider::Cohere);
        assert_eq!(connector.calls(), vec![Provider::Cohere]);
    }

    #[tokio::test]
    async fn exhausted_plan_is_fatal_and_lists_attempts() {
        let store = valid_store(&[Provider::OpenAi, Provider::Cohere]);
        let connector = FakeConnector::with(&[
            (Provider::OpenAi, Some(401)),
            (Provider::Cohere, Some(500)),
        ]);
        let err = initialize(&[Provider::OpenAi, Provider::Cohere], &store, &connector)
            .await
            .err()
            .expect("everything fails");
        match err {
            ChatError::FallbackExhausted { attempted } => {
                assert_eq!(attempted, vec![Provider::OpenAi, Provider::Cohere]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_plan_is_exhausted_without_calls() {
        let store = valid_store(&Provider::ALL);
        let connector = FakeConnector::with(&[]);
        let err = initialize(&[], &store, &connector)
            .await
            .err()
            .expect("nothing to try");
        assert_eq!(err.exit_code(), 3);
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_record_is_skipped_before_probing() {
        let mut records: Vec<(Provider, CredentialRecord)> = valid_store(&[Provider::Cohere])
            .iter()
            .map(|(p, r)| (p, r.clone()))
            .collect();
        records.push((
            Provider::OpenAi,
            CredentialRecord::new("your-openai-key", "gpt-4o", 1000),
        ));
        let store: CredentialStore = records.into_iter().collect();
        let connector = FakeConnector::with(&[]);

        let out = initialize(&[Provider::OpenAi, Provider::Cohere], &store, &connector)
            .await
            .expect("cohere connects");

        assert_eq!(out.provider, Provider::Cohere);
        assert_eq!(connector.calls(), vec![Provider::Cohere]);
        assert_eq!(
            out.report.attempts[0].outcome,
            AttemptOutcome::Skipped(KeyRejection::Placeholder)
        );
        assert_eq!(out.report.probed(), 1);
    }

    #[test]
    fn classify_uses_status_then_text() {
        let status = |s| LlmError::Status {
            provider: Provider::OpenAi,
            status: s,
            body: String::new(),
        };
        assert_eq!(classify(&status(401)), FailureKind::Authentication);
        assert_eq!(classify(&status(403)), FailureKind::Authentication);
        assert_eq!(classify(&status(404)), FailureKind::ModelNotFound);
        assert_eq!(classify(&status(429)), FailureKind::RateLimited);
        assert_eq!(classify(&status(503)), FailureKind::Other);
        assert_eq!(
            classify(&LlmError::Http("proxy said 429 Too Many Requests".into())),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(&LlmError::Http("connection refused".into())),
            FailureKind::Other
        );
        assert_eq!(
            classify(&LlmError::Http("upstream returned status=404".into())),
            FailureKind::ModelNotFound
        );
    }

    #[test]
    fn numbers_inside_addresses_are_not_status_codes() {
        for text in [
            "error sending request for url (http://127.0.0.1:4040/v1/chat)",
            "connection reset after 14290 bytes",
            "request id req_4011abc failed",
        ] {
            assert_eq!(
                classify(&LlmError::Http(text.into())),
                FailureKind::Other,
                "{text}"
            );
        }
        assert_eq!(FailureKind::Other.hint(), None);
    }
}
