//! Operator-facing text transport.
//!
//! The [`Ui`] trait decouples the supervisor from the terminal. Operator
//! messages (retry notices, failure prompts, abort notices) go through this
//! trait; `tracing` is reserved for dev diagnostics. Tests use a scripted
//! implementation that records output and replays canned answers.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Interactive text channel to the operator.
///
/// `Send + Sync` because the prompt arbiter's detached read thread holds a
/// handle while the pipeline thread keeps its own.
pub trait Ui: Send + Sync {
    /// Informational line for the operator.
    fn say(&self, message: &str);

    /// Error line for the operator.
    fn error(&self, message: &str);

    /// Blocking single-line read. The transport offers no cancellation
    /// primitive; callers that need a cancellable wait must race this on a
    /// separate thread.
    fn ask(&self, prompt: &str) -> Result<String>;
}

/// Terminal UI: say → stdout, error → stderr, ask → stdout prompt + stdin line.
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write!(out, "{prompt} ").context("write prompt")?;
            out.flush().context("flush prompt")?;
        }
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read answer")?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}
