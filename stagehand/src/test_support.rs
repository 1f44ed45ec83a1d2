//! Test-only scripted steps and UI doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::context::RunContext;
use crate::io::ui::Ui;
use crate::step::{Action, Step};

/// Global sequence counter so tests can assert cross-step ordering.
static SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    SEQ.fetch_add(1, Ordering::SeqCst)
}

/// Observable counters for a [`ScriptedStep`], usable after the step has been
/// boxed and handed to a runner.
#[derive(Default)]
pub struct StepProbe {
    runs: AtomicU64,
    cleanups: AtomicU64,
    first_cleanup_seq: AtomicU64,
}

impl StepProbe {
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> u64 {
        self.cleanups.load(Ordering::SeqCst)
    }

    /// Sequence number of the first cleanup invocation (0 if never cleaned).
    pub fn cleanup_seq(&self) -> u64 {
        self.first_cleanup_seq.load(Ordering::SeqCst)
    }
}

/// Step that replays a scripted list of actions.
pub struct ScriptedStep {
    name: String,
    actions: Mutex<VecDeque<Action>>,
    fallback: Action,
    error: Option<String>,
    probe: Arc<StepProbe>,
}

impl ScriptedStep {
    /// Step that returns `action` on every invocation.
    pub fn always(name: &str, action: Action) -> (Self, Arc<StepProbe>) {
        Self::build(name, Vec::new(), action, None)
    }

    /// Step that replays `actions` in order, then returns `Halt`.
    pub fn sequence(name: &str, actions: Vec<Action>) -> (Self, Arc<StepProbe>) {
        Self::build(name, actions, Action::Halt, None)
    }

    /// Step that returns `action` on every invocation and records `error`
    /// in the run context, like a real failing step would.
    pub fn failing(name: &str, action: Action, error: &str) -> (Self, Arc<StepProbe>) {
        Self::build(name, Vec::new(), action, Some(error.to_string()))
    }

    fn build(
        name: &str,
        actions: Vec<Action>,
        fallback: Action,
        error: Option<String>,
    ) -> (Self, Arc<StepProbe>) {
        let probe = Arc::new(StepProbe::default());
        let step = Self {
            name: name.to_string(),
            actions: Mutex::new(actions.into()),
            fallback,
            error,
            probe: Arc::clone(&probe),
        };
        (step, probe)
    }
}

impl Step for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &RunContext) -> Action {
        self.probe.runs.fetch_add(1, Ordering::SeqCst);
        let action = self
            .actions
            .lock()
            .expect("actions poisoned")
            .pop_front()
            .unwrap_or(self.fallback);
        if action != Action::Continue {
            if let Some(error) = &self.error {
                ctx.put_error(anyhow!("{error}"));
            }
        }
        action
    }

    fn cleanup(&mut self, _ctx: &RunContext) {
        self.probe.cleanups.fetch_add(1, Ordering::SeqCst);
        let _ = self.probe.first_cleanup_seq.compare_exchange(
            0,
            next_seq(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// UI double: records everything said, replays canned answers.
///
/// With an exhausted answer queue `ask` returns an error; a [`Self::blocking`]
/// instance instead parks forever, standing in for an operator who never
/// answers (used to exercise the cancellation race).
pub struct ScriptedUi {
    answers: Mutex<VecDeque<String>>,
    said: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    block_when_empty: bool,
}

impl ScriptedUi {
    pub fn new(answers: Vec<String>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            said: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            block_when_empty: false,
        }
    }

    /// UI whose `ask` never returns once the answer queue is empty.
    pub fn blocking() -> Self {
        Self {
            block_when_empty: true,
            ..Self::new(Vec::new())
        }
    }

    /// Lines passed to `say`, in order.
    pub fn said(&self) -> Vec<String> {
        self.said.lock().expect("said poisoned").clone()
    }

    /// Lines passed to `error`, in order.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors poisoned").clone()
    }
}

impl Ui for ScriptedUi {
    fn say(&self, message: &str) {
        self.said
            .lock()
            .expect("said poisoned")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("errors poisoned")
            .push(message.to_string());
    }

    fn ask(&self, _prompt: &str) -> Result<String> {
        if let Some(answer) = self.answers.lock().expect("answers poisoned").pop_front() {
            return Ok(answer);
        }
        if self.block_when_empty {
            // Parked forever; the arbiter abandons this thread on cancellation.
            loop {
                std::thread::park();
            }
        }
        Err(anyhow!("no scripted answer left"))
    }
}
