//! Cleanup gating and deduplicated terminal logging.
//!
//! When a run ends abnormally the executor still walks every started step's
//! `cleanup` in reverse start order. The Abort and Ask policies route each of
//! those calls through [`should_run_cleanup`], which decides whether the
//! step's cleanup may proceed and emits the run's terminal notices at most
//! once, keyed on the context's `abort_logged` flag.
//!
//! The step whose cleanup is evaluated first (the most recently started,
//! i.e. the failing one) gets the full notice; later steps get a terse skip
//! line. A step evaluated before any cancellation or halt has been recorded
//! cleans up normally.

use crate::context::RunContext;
use crate::io::ui::Ui;

/// Decide whether a step's cleanup should run, logging terminal notices as a
/// side effect. Returns `false` to suppress cleanup.
pub(crate) fn should_run_cleanup(ctx: &RunContext, ui: &dyn Ui, step_name: &str) -> bool {
    let already_logged = ctx.abort_logged();

    if let Some(message) = ctx.error_message() {
        if !already_logged {
            ui.error(&message);
            ctx.set_abort_logged();
        }
    }
    if ctx.is_cancelled() {
        if !already_logged {
            ui.error("Interrupted, aborting...");
            ctx.set_abort_logged();
        } else {
            ui.error(&format!("aborted: skipping cleanup of step {step_name:?}"));
        }
        return false;
    }
    if ctx.is_halted() {
        if !already_logged {
            ui.error(&format!("Step {step_name:?} failed, aborting..."));
            ctx.set_abort_logged();
        } else {
            ui.error(&format!("aborted: skipping cleanup of step {step_name:?}"));
        }
        return false;
    }
    true
}
