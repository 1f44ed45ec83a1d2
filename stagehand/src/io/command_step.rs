//! Shell-command pipeline step used by the CLI.
//!
//! Each configured `[[step]]` becomes one [`CommandStep`]: run a shell
//! command with a timeout, report `Continue` on exit 0 and `Retry` or `Halt`
//! otherwise, and optionally run a cleanup command when the pipeline unwinds.

use std::process::Command;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::io::config::StepSpec;
use crate::io::process::run_with_timeout;
use crate::step::{Action, Step};

/// Retain at most this much of a command's stdout/stderr for error reporting.
const OUTPUT_LIMIT_BYTES: usize = 100_000;

pub struct CommandStep {
    name: String,
    command: String,
    cleanup_command: Option<String>,
    timeout: Duration,
    retry_on_failure: bool,
}

impl CommandStep {
    pub fn from_spec(spec: &StepSpec) -> Self {
        Self {
            name: spec.name.clone(),
            command: spec.command.clone(),
            cleanup_command: spec.cleanup.clone(),
            timeout: Duration::from_secs(spec.timeout_secs),
            retry_on_failure: spec.retry_on_failure,
        }
    }

    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    /// Failed attempts are retryable only when configured so; the supervisor's
    /// budget decides how many retries actually happen.
    fn failure_action(&self) -> Action {
        if self.retry_on_failure {
            Action::Retry
        } else {
            Action::Halt
        }
    }
}

impl Step for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &RunContext) -> Action {
        info!(step = %self.name, "running command");
        let output = match run_with_timeout(Self::shell(&self.command), self.timeout, OUTPUT_LIMIT_BYTES) {
            Ok(output) => output,
            Err(err) => {
                ctx.put_error(err.context(format!("step {:?}", self.name)));
                return Action::Halt;
            }
        };

        if output.timed_out {
            ctx.put_error(anyhow!(
                "step {:?} timed out after {}s",
                self.name,
                self.timeout.as_secs()
            ));
            return self.failure_action();
        }
        if !output.status.success() {
            let stderr = output.stderr_text();
            let stderr = stderr.trim();
            ctx.put_error(anyhow!(
                "step {:?} failed with status {:?}{}{}",
                self.name,
                output.status.code(),
                if stderr.is_empty() { "" } else { ": " },
                stderr
            ));
            return self.failure_action();
        }
        Action::Continue
    }

    fn cleanup(&mut self, _ctx: &RunContext) {
        let Some(script) = &self.cleanup_command else {
            return;
        };
        info!(step = %self.name, "running cleanup command");
        match run_with_timeout(Self::shell(script), self.timeout, OUTPUT_LIMIT_BYTES) {
            Ok(output) if output.status.success() && !output.timed_out => {}
            Ok(output) => {
                warn!(
                    step = %self.name,
                    exit_code = ?output.status.code(),
                    timed_out = output.timed_out,
                    "cleanup command failed"
                );
            }
            Err(err) => {
                warn!(step = %self.name, err = %err, "cleanup command error");
            }
        }
    }
}
