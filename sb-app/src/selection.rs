//! Provider selection prompt.

use crate::console::{Console, ReadOutcome};
use sb_llm::Provider;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only one candidate; nothing was asked.
    Auto,
    UserChosen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub provider: Provider,
    pub mode: SelectionMode,
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no valid API keys found for any provider")]
    NoCandidates,

    #[error("provider selection aborted by operator")]
    Aborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub async fn choose<W: Write>(
    console: &mut Console<W>,
    candidates: &[Provider],
) -> Result<Selection, SelectionError> {
    match candidates {
        [] => return Err(SelectionError::NoCandidates),
        [only] => {
            console.say(&format!("Using {} provider", only.display_name()))?;
            return Ok(Selection {
                provider: *only,
                mode: SelectionMode::Auto,
            });
        }
        _ => {}
    }

    console.say("Available providers:")?;
    for (i, provider) in candidates.iter().enumerate() {
        console.say(&format!("{}. {}", i + 1, provider.display_name()))?;
    }

    let prompt = format!("Select provider (1-{}): ", candidates.len());
    loop {
        let line = match console.prompt(&prompt).await? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Eof | ReadOutcome::Interrupted => return Err(SelectionError::Aborted),
        };
        let Ok(choice) = line.trim().parse::<i64>() else {
            console.say("Please enter a number")?;
            continue;
        };
        if choice >= 1 && (choice as usize) <= candidates.len() {
            return Ok(Selection {
                provider: candidates[choice as usize - 1],
                mode: SelectionMode::UserChosen,
            });
        }
        console.say("Invalid choice, try again")?;
    }
}
