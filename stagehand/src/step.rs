//! Step contract consumed by the supervisor.
//!
//! The supervisor never constructs steps; callers hand it boxed [`Step`]
//! implementations and the runner factory wraps each one in the failure
//! policy configured for the run.

use crate::context::RunContext;

/// Per-invocation verdict of a step's `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The step succeeded; the pipeline moves on.
    Continue,
    /// The step failed in a way worth re-attempting.
    Retry,
    /// The step failed; the pipeline must stop.
    Halt,
}

/// One unit of pipeline work.
///
/// `run` performs the step's side effects against the shared [`RunContext`]
/// and reports whether the pipeline should continue, retry, or halt. Steps
/// that fail should record the failure with [`RunContext::put_error`] before
/// returning; the supervisor decides control flow but never fabricates error
/// content.
///
/// `cleanup` undoes the step's side effects. The executor invokes it on every
/// started step in reverse start order, whether or not the run succeeded, and
/// the failure policy in effect may suppress it once the run is known to be
/// terminating abnormally.
pub trait Step {
    /// Display name used in retry notices, failure prompts, and skip notices.
    fn name(&self) -> &str;

    fn run(&mut self, ctx: &RunContext) -> Action;

    fn cleanup(&mut self, ctx: &RunContext);
}
