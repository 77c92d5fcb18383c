//! Interactive chat loop: selection, initialization, turns, switching.

use crate::commands::{ChatCommand, parse_command};
use crate::config::ChatConfig;
use crate::console::{Console, ReadOutcome};
use crate::error::ChatError;
use crate::fallback::build_plan;
use crate::initializer::{Connector, classify, initialize};
use crate::selection::{SelectionError, choose};
use crate::session::{ActiveSession, ChatBackend, Conversation};
use crate::validation::available_providers;
use std::collections::BTreeSet;
use std::io::Write;
use std::time::Instant;

const TURN_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    AwaitingProviderSelection,
    Initializing,
    Ready,
    Terminated,
}

enum Flow {
    Continue,
    Quit,
}

pub struct ChatApp<C: Connector, W> {
    config: ChatConfig,
    connector: C,
    console: Console<W>,
    session: Option<ActiveSession<C::Client>>,
    conversation: Conversation,
    state: AppState,
}

impl<C, W> ChatApp<C, W>
where
    C: Connector,
    W: Write,
{
    pub fn new(config: ChatConfig, connector: C, console: Console<W>) -> Self {
        Self {
            config,
            connector,
            console,
            session: None,
            conversation: Conversation::new(),
            state: AppState::AwaitingProviderSelection,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Run until the operator leaves or a fatal error occurs. The session is
    /// released on every path.
    pub async fn run(&mut self) -> Result<(), ChatError> {
        let result = self.run_inner().await;
        self.release_session();
        self.state = AppState::Terminated;
        if let Err(e) = &result {
            tracing::error!(error = %e, "chat loop terminated");
        }
        result
    }

    async fn run_inner(&mut self) -> Result<(), ChatError> {
        self.console.say("Welcome to the AI Chat Assistant!")?;
        if !self.select_and_initialize().await? {
            return self.farewell("Goodbye!");
        }
        self.console
            .say("Type 'exit' to quit or 'switch' to change provider")?;

        loop {
            let line = match self.console.prompt("\nYou: ").await? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Eof | ReadOutcome::Interrupted => {
                    return self.farewell("\nGoodbye!");
                }
            };

            let flow = match parse_command(&line) {
                ChatCommand::Empty => Flow::Continue,
                ChatCommand::Exit => return self.farewell("Goodbye!"),
                ChatCommand::Switch => self.switch().await?,
                ChatCommand::Say(text) => self.turn(text).await?,
            };
            if let Flow::Quit = flow {
                return self.farewell("\nGoodbye!");
            }
        }
    }

    /// Returns false when the operator abandoned selection or interrupted
    /// initialization. Any previous session is left in place.
    async fn select_and_initialize(&mut self) -> Result<bool, ChatError> {
        self.state = AppState::AwaitingProviderSelection;
        let available = available_providers(&self.config.credentials);
        let selection = match choose(&mut self.console, &available).await {
            Ok(selection) => selection,
            Err(SelectionError::NoCandidates) => {
                return Err(ChatError::Configuration(
                    "no valid API keys found for any provider".to_string(),
                ));
            }
            Err(SelectionError::Aborted) => return Ok(false),
            Err(SelectionError::Io(e)) => return Err(e.into()),
        };
        tracing::info!(
            provider = %selection.provider,
            mode = ?selection.mode,
            "provider selected"
        );

        self.state = AppState::Initializing;
        let validated: BTreeSet<_> = available.iter().copied().collect();
        let plan = build_plan(
            Some(selection.provider),
            &self.config.fallback_order,
            &validated,
        );
        tracing::debug!(plan = ?plan, "fallback plan built");

        let initialized = tokio::select! {
            biased;
            _ = self.console.interrupted() => {
                tracing::info!("initialization interrupted by operator");
                return Ok(false);
            }
            r = initialize(&plan, &self.config.credentials, &self.connector) => r?,
        };
        tracing::debug!(
            probed = initialized.report.probed(),
            attempts = ?initialized.report.attempts,
            "initialization report"
        );
        if initialized.provider != selection.provider {
            tracing::warn!(
                requested = %selection.provider,
                using = %initialized.provider,
                "fell back to another provider"
            );
        }

        self.release_session();
        self.session = Some(ActiveSession::new(initialized.provider, initialized.client));
        self.state = AppState::Ready;
        Ok(true)
    }

    async fn switch(&mut self) -> Result<Flow, ChatError> {
        let available = available_providers(&self.config.credentials);
        if let [only] = available.as_slice() {
            self.console
                .say(&format!("Only {} provider available", only.display_name()))?;
            return Ok(Flow::Continue);
        }
        if !self.select_and_initialize().await? {
            return Ok(Flow::Quit);
        }
        if let Some(session) = &self.session {
            let name = session.provider().display_name();
            self.console.say(&format!("Switched to {name} provider"))?;
        }
        Ok(Flow::Continue)
    }

    async fn turn(&mut self, text: &str) -> Result<Flow, ChatError> {
        let Some(session) = self.session.as_ref() else {
            return Err(ChatError::Internal("no active session".to_string()));
        };
        let provider = session.provider();
        self.conversation.push_user(text);

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = self.console.interrupted() => None,
            r = session.client().reply(self.conversation.messages()) => Some(r),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Some(Ok(resp)) => {
                tracing::debug!(
                    provider = %provider,
                    model = %session.client().model(),
                    prompt_tokens = resp.usage.prompt_tokens,
                    completion_tokens = resp.usage.completion_tokens,
                    finish_reason = %resp.finish_reason,
                    elapsed_ms,
                    "turn completed"
                );
                self.conversation.push_assistant(&resp.message.content);
                self.console
                    .say(&format!("\nAssistant: {}", resp.message.content))?;
                Ok(Flow::Continue)
            }
            Some(Err(e)) => {
                tracing::debug!(
                    provider = %provider,
                    error = %e,
                    kind = ?classify(&e),
                    elapsed_ms,
                    "error during conversation"
                );
                self.conversation.discard_unanswered();
                self.console.say(TURN_ERROR_MESSAGE)?;
                Ok(Flow::Continue)
            }
            None => {
                self.conversation.discard_unanswered();
                Ok(Flow::Quit)
            }
        }
    }

    fn farewell(&mut self, text: &str) -> Result<(), ChatError> {
        self.console.say(text)?;
        Ok(())
    }

    fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.release();
        }
    }
}
