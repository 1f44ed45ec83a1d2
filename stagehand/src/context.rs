//! Shared mutable state for one pipeline run.
//!
//! A [`RunContext`] is created fresh per run and discarded when the run ends.
//! Well-known run state lives in explicit typed fields; a generic JSON bag is
//! the escape hatch for step-specific data. The flags are monotonic: they
//! transition unset to set and are never cleared, so readers may race writers
//! without compare-and-swap discipline.
//!
//! The context is shared between the pipeline thread and the detached prompt
//! read thread, hence the interior `std::sync` synchronization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Where the debug pause hook is being invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseLocation {
    AfterRun,
    AfterCleanup,
}

/// Hook invoked between steps when the run was built in debug mode.
pub type PauseFn = Arc<dyn Fn(PauseLocation, &str, &RunContext) + Send + Sync>;

/// Shared run state visible to every step and to the supervisor.
#[derive(Default)]
pub struct RunContext {
    error: Mutex<Option<anyhow::Error>>,
    cancelled: AtomicBool,
    halted: AtomicBool,
    aborted: AtomicBool,
    abort_logged: AtomicBool,
    max_step_retries: AtomicU32,
    pause: Mutex<Option<PauseFn>>,
    extra: Mutex<HashMap<String, Value>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recent failure. Later failures replace earlier ones;
    /// the cleanup coordinator guarantees at most one is surfaced per run.
    pub fn put_error(&self, err: anyhow::Error) {
        *self.error.lock().expect("error slot poisoned") = Some(err);
    }

    /// Render the recorded failure, if any, including its cause chain.
    pub fn error_message(&self) -> Option<String> {
        self.error
            .lock()
            .expect("error slot poisoned")
            .as_ref()
            .map(|err| format!("{err:#}"))
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().expect("error slot poisoned").is_some()
    }

    /// Mark the run cancelled (operator interrupt). Advisory and cooperative:
    /// steps and the prompt arbiter poll it, nothing is preempted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Recorded by the executor when a step halts the pipeline.
    pub fn record_halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Recorded by the Ask policy when the operator chooses abort-without-cleanup.
    pub fn record_abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Whether the terminal-failure notice has already been emitted this run.
    pub fn abort_logged(&self) -> bool {
        self.abort_logged.load(Ordering::SeqCst)
    }

    /// Never cleared for the remainder of the run.
    pub fn set_abort_logged(&self) {
        self.abort_logged.store(true, Ordering::SeqCst);
    }

    /// Maximum additional automatic attempts after a step's first run.
    /// Read fresh on every retry decision, not cached at decoration time.
    pub fn max_step_retries(&self) -> u32 {
        self.max_step_retries.load(Ordering::SeqCst)
    }

    pub fn set_max_step_retries(&self, retries: u32) {
        self.max_step_retries.store(retries, Ordering::SeqCst);
    }

    /// Debug pause hook installed by the runner factory, if any.
    pub fn pause_fn(&self) -> Option<PauseFn> {
        self.pause.lock().expect("pause slot poisoned").clone()
    }

    pub fn set_pause_fn(&self, pause: PauseFn) {
        *self.pause.lock().expect("pause slot poisoned") = Some(pause);
    }

    /// Step-specific data with no typed field. Keys are owned by the steps
    /// that write them; the supervisor itself never reads this bag.
    pub fn put(&self, key: &str, value: Value) {
        self.extra
            .lock()
            .expect("bag poisoned")
            .insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.extra.lock().expect("bag poisoned").get(key).cloned()
    }
}
