//! Failure prompt raced against run cancellation.
//!
//! The Ask policy needs a three-way answer from the operator, but the only
//! transport is a blocking line read with no cancellation primitive. The
//! arbiter therefore spawns the read on a detached thread and waits on a
//! channel with a short timeout, checking the run's cancellation flag on
//! every tick. If cancellation wins the race the outcome defaults to cleanup
//! and the pending read is abandoned; its thread exits whenever the read
//! finally returns.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::context::RunContext;
use crate::io::ui::Ui;

/// Operator's answer to a step-failure prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Clean up and exit.
    Cleanup,
    /// Abort without cleanup.
    Abort,
    /// Re-run the failing step.
    Retry,
}

/// Upper bound on how long an observed cancellation can go unnoticed while
/// waiting for the operator.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

const PROMPT: &str =
    "[c] Clean up and exit, [a] abort without cleanup, or [r] retry step (build may fail even if retry succeeds)?";

/// Announce the failing step and obtain an [`AskOutcome`], observing run
/// cancellation while the prompt is pending.
pub(crate) fn ask(ui: &Arc<dyn Ui>, step_name: &str, ctx: &RunContext) -> AskOutcome {
    ui.say(&format!("Step {step_name:?} failed"));

    let (tx, rx) = mpsc::channel();
    let prompt_ui = Arc::clone(ui);
    thread::spawn(move || {
        // Send fails when the arbiter already returned on cancellation; the
        // answer is discarded in that case.
        let _ = tx.send(prompt_loop(prompt_ui.as_ref()));
    });

    loop {
        match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(outcome) => return outcome,
            Err(RecvTimeoutError::Timeout) => {
                if ctx.is_cancelled() {
                    debug!(step = step_name, "cancellation observed while prompting");
                    return AskOutcome::Cleanup;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return AskOutcome::Cleanup,
        }
    }
}

/// Re-prompt until the operator's answer classifies; runs on the detached
/// read thread.
fn prompt_loop(ui: &dyn Ui) -> AskOutcome {
    loop {
        let line = match ui.ask(PROMPT) {
            Ok(line) => line,
            Err(err) => {
                warn!(err = %err, "error asking for input");
                return AskOutcome::Cleanup;
            }
        };
        match classify_answer(&line) {
            Some(outcome) => return outcome,
            None => ui.say(&format!("Incorrect input: {line:?}")),
        }
    }
}

/// Classify an answer by its case-insensitive first character. Empty input
/// defaults to cleanup; unrecognized input yields `None` (re-prompt).
fn classify_answer(line: &str) -> Option<AskOutcome> {
    match line.chars().next().map(|c| c.to_ascii_lowercase()) {
        None | Some('c') => Some(AskOutcome::Cleanup),
        Some('a') => Some(AskOutcome::Abort),
        Some('r') => Some(AskOutcome::Retry),
        Some(_) => None,
    }
}
