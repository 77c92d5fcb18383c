//! Line-oriented operator console.
//!
//! Stdin is read on a detached thread that feeds a channel, so nothing the
//! runtime owns ever blocks on the terminal. Ctrl-C is captured by a single
//! listener installed at startup and queued, so a press made while no prompt
//! is waiting is seen by the next wait instead of being dropped.

use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

const LINE_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Eof,
    Interrupted,
}

/// Queue of operator interrupts.
pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Interrupts {
    /// Forward every Ctrl-C for the life of the runtime.
    pub fn ctrl_c() -> Self {
        let (tx, interrupts) = Self::channel();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "could not listen for ctrl-c");
                    break;
                }
                tracing::debug!("interrupt received");
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        interrupts
    }

    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Resolves on the next queued interrupt. Never resolves once every
    /// sender is gone.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Read `input` line by line on its own thread. The thread is never joined;
/// a read still blocked at exit dies with the process.
pub fn spawn_line_reader<R>(input: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::spawn(move || {
        for line in input.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub struct Console<W> {
    lines: mpsc::Receiver<io::Result<String>>,
    interrupts: Interrupts,
    output: W,
}

impl Console<io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(
            spawn_line_reader(io::BufReader::new(io::stdin())),
            Interrupts::ctrl_c(),
            io::stdout(),
        )
    }
}

impl<W: Write> Console<W> {
    pub fn new(
        lines: mpsc::Receiver<io::Result<String>>,
        interrupts: Interrupts,
        output: W,
    ) -> Self {
        Self {
            lines,
            interrupts,
            output,
        }
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")?;
        self.output.flush()
    }

    /// Print `prompt` without a newline and wait for one line of input.
    pub async fn prompt(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        tokio::select! {
            biased;
            _ = self.interrupts.recv() => Ok(ReadOutcome::Interrupted),
            line = self.lines.recv() => match line {
                Some(line) => Ok(ReadOutcome::Line(line?)),
                None => Ok(ReadOutcome::Eof),
            },
        }
    }

    /// Wait for the next operator interrupt.
    pub async fn interrupted(&mut self) {
        self.interrupts.recv().await
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }
}
