//! Pipeline configuration (TOML).
//!
//! A pipeline file names the failure policy for the run and lists the
//! command steps in execution order:
//!
//! ```toml
//! on_error = "ask"
//! max_step_retries = 2
//!
//! [[step]]
//! name = "build"
//! command = "make image"
//! cleanup = "make clean"
//! timeout_secs = 600
//! retry_on_failure = true
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

fn default_timeout_secs() -> u64 {
    600
}

/// One configured pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepSpec {
    /// Display name used in notices and prompts.
    pub name: String,
    /// Shell command executed via `sh -c`.
    pub command: String,
    /// Optional shell command run when the pipeline unwinds.
    #[serde(default)]
    pub cleanup: Option<String>,
    /// Wall-clock budget for the command (and its cleanup).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Report a failed attempt as retryable instead of halting outright.
    #[serde(default)]
    pub retry_on_failure: bool,
}

/// Pipeline configuration (TOML). Missing fields default to the run-once,
/// clean-up-on-failure behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Failure policy selector: `""`/`"cleanup"`, `"abort"`, or `"ask"`.
    pub on_error: String,
    /// Pause for the operator between steps.
    pub debug: bool,
    /// Maximum automatic re-attempts per step after its first run.
    pub max_step_retries: u32,
    /// Steps in execution order.
    pub step: Vec<StepSpec>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step.is_empty() {
            return Err(anyhow!("pipeline has no steps"));
        }
        for (index, step) in self.step.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(anyhow!("step {index} has an empty name"));
            }
            if step.command.trim().is_empty() {
                return Err(anyhow!("step {:?} has an empty command", step.name));
            }
            if step.timeout_secs == 0 {
                return Err(anyhow!("step {:?}: timeout_secs must be > 0", step.name));
            }
        }
        let mut names: Vec<&str> = self.step.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.step.len() {
            return Err(anyhow!("step names must be unique"));
        }
        Ok(())
    }
}

/// Load and validate a pipeline file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
