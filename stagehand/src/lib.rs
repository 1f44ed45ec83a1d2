//! Failure-handling supervisor for sequential build pipelines.
//!
//! A pipeline is an ordered list of side-effecting [`step::Step`]s sharing a
//! [`context::RunContext`]. The supervisor decorates every step with the
//! failure policy configured for the run (clean up and stop, abort without
//! cleanup, or ask the operator), adds bounded automatic retry, and
//! coordinates at-most-once cleanup decisions and terminal logging across
//! the whole run, including while an interactive prompt races an operator
//! interrupt.
//!
//! Layout follows a strict separation:
//!
//! - Supervision logic ([`policy`], [`cleanup`], [`prompt`], [`runner`]):
//!   deterministic given a context and a UI, fully testable with scripted
//!   doubles.
//! - [`io`]: side-effecting collaborators (terminal UI, TOML configuration,
//!   shell-command steps) used by the CLI.

pub mod cleanup;
pub mod context;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod policy;
pub mod prompt;
pub mod runner;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
