//! Tracing setup. Diagnostics go to stderr; chat text owns stdout.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

const LOG_FORMAT_VAR: &str = "SWITCHBOARD_LOG_FORMAT";
const VERBOSE_FILTER: &str = "info,switchboard=debug,sb_llm=debug";
const QUIET_FILTER: &str = "warn";

pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new(if verbose { VERBOSE_FILTER } else { QUIET_FILTER }),
    };
    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let log_format = std::env::var(LOG_FORMAT_VAR)
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(span_events)
                .with_target(true)
                .with_file(verbose)
                .with_line_number(verbose)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(span_events)
                .with_target(true)
                .with_file(verbose)
                .with_line_number(verbose)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(span_events)
                .with_target(verbose)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported {LOG_FORMAT_VAR}={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        verbose,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}
