//! Runner factory and sequential pipeline executor.
//!
//! [`build_runner`] wraps every raw step in the failure policy configured for
//! the run (the policy is a per-run setting, never per-step) and returns the
//! strictly sequential [`PipelineRunner`]. In debug mode a pause hook is
//! installed after each step's run and cleanup, and its handle is exposed
//! through the run context so embedders can drive the same pause themselves.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::{PauseFn, PauseLocation, RunContext};
use crate::io::ui::Ui;
use crate::policy::{AbortStep, AskStep, BasicStep};
use crate::step::{Action, Step};

/// Run-wide failure-handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Halt on failure, always clean up.
    #[default]
    Cleanup,
    /// Halt on failure; suppress cleanup of later steps once the run is
    /// terminating abnormally.
    Abort,
    /// Prompt the operator on failure.
    Ask,
}

impl FailurePolicy {
    /// Parse a configuration string. Empty and `"cleanup"` select the
    /// default; unrecognized values fall back to the default rather than
    /// failing the run.
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "cleanup" => Self::Cleanup,
            "abort" => Self::Abort,
            "ask" => Self::Ask,
            other => {
                warn!(value = other, "unrecognized on-error policy, using cleanup");
                Self::Cleanup
            }
        }
    }
}

/// Options consumed by [`build_runner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    pub on_error: FailurePolicy,
    pub debug: bool,
}

/// Strictly sequential pipeline executor.
///
/// Steps run one at a time in order. A non-`Continue` result records the
/// halted flag and stops the walk; cancellation observed between steps stops
/// it as well. Cleanup then runs on every started step in reverse start
/// order, whether or not the run succeeded.
pub struct PipelineRunner {
    steps: Vec<Box<dyn Step>>,
    pause: Option<PauseFn>,
}

impl PipelineRunner {
    /// Execute the pipeline to completion. Returns `true` when every step
    /// continued, `false` when the run halted or was cancelled.
    pub fn run(&mut self, ctx: &RunContext) -> bool {
        let mut started = 0;
        let mut completed = true;

        for step in &mut self.steps {
            if ctx.is_cancelled() {
                debug!(step = step.name(), "cancelled before step");
                completed = false;
                break;
            }

            info!(step = step.name(), "running step");
            started += 1;
            let action = step.run(ctx);
            if let Some(pause) = &self.pause {
                pause(PauseLocation::AfterRun, step.name(), ctx);
            }
            if action != Action::Continue {
                debug!(step = step.name(), ?action, "step halted the pipeline");
                ctx.record_halt();
                completed = false;
                break;
            }
        }

        for step in self.steps[..started].iter_mut().rev() {
            debug!(step = step.name(), "cleaning up step");
            step.cleanup(ctx);
            if let Some(pause) = &self.pause {
                pause(PauseLocation::AfterCleanup, step.name(), ctx);
            }
        }

        completed && !ctx.is_halted()
    }
}

/// Wrap every step in the configured policy and assemble the executor.
///
/// Pure assembly: no error conditions. With `debug` set, the pause hook is
/// also stored in the context's pause slot for external use.
pub fn build_runner(
    steps: Vec<Box<dyn Step>>,
    options: &RunnerOptions,
    ui: Arc<dyn Ui>,
    ctx: &RunContext,
) -> PipelineRunner {
    let steps: Vec<Box<dyn Step>> = steps
        .into_iter()
        .map(|step| -> Box<dyn Step> {
            match options.on_error {
                FailurePolicy::Cleanup => Box::new(BasicStep::new(step, Arc::clone(&ui))),
                FailurePolicy::Abort => Box::new(AbortStep::new(step, Arc::clone(&ui))),
                FailurePolicy::Ask => Box::new(AskStep::new(step, Arc::clone(&ui))),
            }
        })
        .collect();

    let pause = options.debug.then(|| {
        let pause = debug_pause_fn(Arc::clone(&ui));
        ctx.set_pause_fn(Arc::clone(&pause));
        pause
    });

    PipelineRunner { steps, pause }
}

/// Pause hook used in debug mode: waits for an operator keypress after each
/// step's run and cleanup.
fn debug_pause_fn(ui: Arc<dyn Ui>) -> PauseFn {
    Arc::new(move |location: PauseLocation, name: &str, _ctx: &RunContext| {
        let phase = match location {
            PauseLocation::AfterRun => "run",
            PauseLocation::AfterCleanup => "cleanup",
        };
        if let Err(err) = ui.ask(&format!(
            "Pausing after {phase} of step {name:?}. Press enter to continue."
        )) {
            warn!(err = %err, "error waiting for debug pause");
        }
    })
}
