//! Switchboard: interactive multi-provider LLM chat client.

mod app;
mod commands;
mod config;
mod console;
mod credentials;
mod error;
mod fallback;
mod initializer;
mod logging;
mod selection;
mod session;
mod validation;

use crate::app::ChatApp;
use crate::config::{ChatConfig, EnvSource};
use crate::console::Console;
use crate::error::ChatError;
use crate::initializer::LiveConnector;
use clap::Parser;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "switchboard",
    version,
    about = "Chat with OpenAI, Anthropic or Cohere, falling back between them"
)]
struct Cli {
    /// Enable verbose diagnostics (provider selection, probes, per-turn timing).
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before tracing, so RUST_LOG and SWITCHBOARD_LOG_FORMAT may live in the file.
    let env_path = config::default_env_file();
    let env_source = config::load_env_file(&env_path);

    if let Err(e) = logging::init_tracing(cli.debug) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }
    install_panic_hook();

    match run(cli, env_source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            if let Some(remediation) = e.remediation() {
                eprintln!("{remediation}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, env_source: Result<EnvSource, ChatError>) -> Result<(), ChatError> {
    match env_source? {
        EnvSource::File(path) => {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        EnvSource::ProcessOnly => {
            tracing::debug!("no environment file; using process environment only");
        }
    }

    let config = ChatConfig::from_env()?;
    if cli.debug {
        config.log_summary();
    }

    let mut app = ChatApp::new(config, LiveConnector, Console::stdio());
    let result = app.run().await;
    tracing::debug!(state = ?app.state(), ok = result.is_ok(), "chat loop finished");
    result
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
