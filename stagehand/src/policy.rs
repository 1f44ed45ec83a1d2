//! Failure-policy decorators wrapped around every pipeline step.
//!
//! The runner factory wraps each raw step in one of three decorators chosen
//! once per run: [`BasicStep`] (always clean up), [`AbortStep`] (suppress
//! later cleanup once the run is terminating abnormally), and [`AskStep`]
//! (prompt the operator on failure). All three share the bounded automatic
//! retry loop; callers never see an unresolved `Retry` because exhaustion
//! collapses to `Halt`.

use std::sync::Arc;

use tracing::debug;

use crate::cleanup::should_run_cleanup;
use crate::context::RunContext;
use crate::io::ui::Ui;
use crate::prompt::{AskOutcome, ask};
use crate::step::{Action, Step};

/// Run a step, re-invoking it while it asks for a retry and the budget
/// allows. The budget is read fresh from the context on every decision.
/// Exhausted retries and first-attempt halts are indistinguishable to the
/// caller: both come back as `Halt`.
fn run_with_retries(step: &mut dyn Step, ctx: &RunContext, ui: &dyn Ui) -> Action {
    let mut action = step.run(ctx);
    if action == Action::Continue {
        return Action::Continue;
    }

    let mut retries = 0;
    while action == Action::Retry && retries < ctx.max_step_retries() {
        ui.say(&format!("Retrying step: {}", step.name()));
        action = step.run(ctx);
        if action == Action::Continue {
            return Action::Continue;
        }
        retries += 1;
    }

    Action::Halt
}

/// Default policy: retry within budget, halt on failure, always clean up.
pub(crate) struct BasicStep {
    step: Box<dyn Step>,
    ui: Arc<dyn Ui>,
}

impl BasicStep {
    pub(crate) fn new(step: Box<dyn Step>, ui: Arc<dyn Ui>) -> Self {
        Self { step, ui }
    }
}

impl Step for BasicStep {
    fn name(&self) -> &str {
        self.step.name()
    }

    fn run(&mut self, ctx: &RunContext) -> Action {
        run_with_retries(self.step.as_mut(), ctx, self.ui.as_ref())
    }

    fn cleanup(&mut self, ctx: &RunContext) {
        self.step.cleanup(ctx);
    }
}

/// Abort policy: same run behavior as [`BasicStep`], but once the run is
/// cancelled or halted, cleanup of later steps is suppressed via the
/// cleanup coordinator.
pub(crate) struct AbortStep {
    step: Box<dyn Step>,
    ui: Arc<dyn Ui>,
}

impl AbortStep {
    pub(crate) fn new(step: Box<dyn Step>, ui: Arc<dyn Ui>) -> Self {
        Self { step, ui }
    }
}

impl Step for AbortStep {
    fn name(&self) -> &str {
        self.step.name()
    }

    fn run(&mut self, ctx: &RunContext) -> Action {
        run_with_retries(self.step.as_mut(), ctx, self.ui.as_ref())
    }

    fn cleanup(&mut self, ctx: &RunContext) {
        if !should_run_cleanup(ctx, self.ui.as_ref(), self.step.name()) {
            return;
        }
        self.step.cleanup(ctx);
    }
}

/// Ask policy: on failure (after automatic retries), surface the error and
/// prompt the operator for cleanup, abort, or retry. An operator-requested
/// retry re-enters the run from the top with a fresh automatic budget.
pub(crate) struct AskStep {
    step: Box<dyn Step>,
    ui: Arc<dyn Ui>,
}

impl AskStep {
    pub(crate) fn new(step: Box<dyn Step>, ui: Arc<dyn Ui>) -> Self {
        Self { step, ui }
    }
}

impl Step for AskStep {
    fn name(&self) -> &str {
        self.step.name()
    }

    fn run(&mut self, ctx: &RunContext) -> Action {
        loop {
            if run_with_retries(self.step.as_mut(), ctx, self.ui.as_ref()) == Action::Continue {
                return Action::Continue;
            }

            if let Some(message) = ctx.error_message() {
                self.ui.error(&message);
            }

            match ask(&self.ui, self.step.name(), ctx) {
                AskOutcome::Cleanup => return Action::Halt,
                AskOutcome::Abort => {
                    debug!(step = self.step.name(), "operator chose abort");
                    ctx.record_abort();
                    return Action::Halt;
                }
                AskOutcome::Retry => continue,
            }
        }
    }

    fn cleanup(&mut self, ctx: &RunContext) {
        if ctx.is_aborted() && !should_run_cleanup(ctx, self.ui.as_ref(), self.step.name()) {
            return;
        }
        self.step.cleanup(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedStep, ScriptedUi};

    fn ui_with(answers: Vec<&str>) -> Arc<ScriptedUi> {
        Arc::new(ScriptedUi::new(
            answers.into_iter().map(str::to_string).collect(),
        ))
    }

    #[test]
    fn exhausted_budget_runs_step_n_plus_one_times_and_halts() {
        let ctx = RunContext::new();
        ctx.set_max_step_retries(3);
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("flaky", Action::Retry);
        let mut wrapped = BasicStep::new(Box::new(step), ui.clone());

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert_eq!(probe.runs(), 4);
        assert_eq!(ui.said().len(), 3); // one retry notice per extra attempt
    }

    #[test]
    fn zero_budget_means_single_attempt() {
        let ctx = RunContext::new();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("flaky", Action::Retry);
        let mut wrapped = BasicStep::new(Box::new(step), ui);

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert_eq!(probe.runs(), 1);
    }

    #[test]
    fn retry_then_success_stops_early() {
        let ctx = RunContext::new();
        ctx.set_max_step_retries(5);
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::sequence(
            "flaky",
            vec![Action::Retry, Action::Retry, Action::Continue],
        );
        let mut wrapped = BasicStep::new(Box::new(step), ui);

        assert_eq!(wrapped.run(&ctx), Action::Continue);
        assert_eq!(probe.runs(), 3);
    }

    #[test]
    fn budget_is_read_fresh_not_cached() {
        let ctx = RunContext::new();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("flaky", Action::Retry);
        let mut wrapped = BasicStep::new(Box::new(step), ui);

        // Budget raised after decoration; the loop must see it.
        ctx.set_max_step_retries(2);
        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert_eq!(probe.runs(), 3);
    }

    #[test]
    fn first_attempt_halt_never_retries() {
        let ctx = RunContext::new();
        ctx.set_max_step_retries(3);
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("hard", Action::Halt);
        let mut wrapped = BasicStep::new(Box::new(step), ui.clone());

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert_eq!(probe.runs(), 1);
        assert!(ui.said().is_empty());
    }

    #[test]
    fn basic_cleanup_is_unconditional() {
        let ctx = RunContext::new();
        ctx.cancel();
        ctx.record_halt();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("tidy", Action::Continue);
        let mut wrapped = BasicStep::new(Box::new(step), ui);

        wrapped.cleanup(&ctx);
        assert_eq!(probe.cleanups(), 1);
    }

    #[test]
    fn abort_cleanup_suppressed_on_cancelled_run() {
        let ctx = RunContext::new();
        ctx.cancel();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("tidy", Action::Continue);
        let mut wrapped = AbortStep::new(Box::new(step), ui);

        wrapped.cleanup(&ctx);
        assert_eq!(probe.cleanups(), 0);
    }

    #[test]
    fn abort_cleanup_runs_when_run_is_healthy() {
        let ctx = RunContext::new();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("tidy", Action::Continue);
        let mut wrapped = AbortStep::new(Box::new(step), ui);

        wrapped.cleanup(&ctx);
        assert_eq!(probe.cleanups(), 1);
    }

    #[test]
    fn ask_operator_abort_sets_flag_and_halts() {
        let ctx = RunContext::new();
        ctx.put_error(anyhow::anyhow!("disk full"));
        let ui = ui_with(vec!["a"]);
        let (step, probe) = ScriptedStep::always("image", Action::Halt);
        let mut wrapped = AskStep::new(Box::new(step), ui.clone());

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert_eq!(probe.runs(), 1);
        assert!(ctx.is_aborted());
        // Recorded error surfaced before the prompt.
        assert!(ui.errors().contains(&"disk full".to_string()));
        assert!(ui.said().contains(&"Step \"image\" failed".to_string()));
    }

    #[test]
    fn ask_operator_cleanup_halts_without_abort_flag() {
        let ctx = RunContext::new();
        let ui = ui_with(vec!["c"]);
        let (step, _probe) = ScriptedStep::always("image", Action::Halt);
        let mut wrapped = AskStep::new(Box::new(step), ui);

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn ask_operator_retry_reruns_with_fresh_budget() {
        let ctx = RunContext::new();
        ctx.set_max_step_retries(1);
        let ui = ui_with(vec!["r"]);
        // First pass: Retry then Halt exhausts the budget. Operator retry:
        // a fresh pass gets its own budget and succeeds on its retry.
        let (step, probe) = ScriptedStep::sequence(
            "image",
            vec![Action::Retry, Action::Halt, Action::Retry, Action::Continue],
        );
        let mut wrapped = AskStep::new(Box::new(step), ui);

        assert_eq!(wrapped.run(&ctx), Action::Continue);
        assert_eq!(probe.runs(), 4);
    }

    #[test]
    fn ask_abort_still_cleans_the_failing_step_itself() {
        let ctx = RunContext::new();
        let ui = ui_with(vec!["a"]);
        let (step, probe) = ScriptedStep::failing("image", Action::Halt, "disk full");
        let mut wrapped = AskStep::new(Box::new(step), ui.clone());

        assert_eq!(wrapped.run(&ctx), Action::Halt);
        assert!(ctx.is_aborted());

        // No halt recorded yet when the failing step's own cleanup is
        // evaluated, so the coordinator lets it proceed after logging the
        // terminal error once.
        wrapped.cleanup(&ctx);
        assert_eq!(probe.cleanups(), 1);
        assert!(ctx.abort_logged());
    }

    #[test]
    fn ask_cleanup_unconditional_unless_aborted() {
        let ctx = RunContext::new();
        ctx.record_halt();
        let ui = ui_with(Vec::new());
        let (step, probe) = ScriptedStep::always("image", Action::Continue);
        let mut wrapped = AskStep::new(Box::new(step), ui.clone());

        // Halted but not aborted: the Ask policy still cleans up.
        wrapped.cleanup(&ctx);
        assert_eq!(probe.cleanups(), 1);

        ctx.record_abort();
        wrapped.cleanup(&ctx);
        // Aborted: coordinator suppresses (run is halted).
        assert_eq!(probe.cleanups(), 1);
    }
}
