//! Pipeline supervisor CLI.
//!
//! Runs a TOML-described pipeline of shell-command steps under the
//! configured failure policy (`on_error = "cleanup" | "abort" | "ask"`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use stagehand::context::RunContext;
use stagehand::exit_codes;
use stagehand::io::command_step::CommandStep;
use stagehand::io::config::load_config;
use stagehand::io::ui::{ConsoleUi, Ui};
use stagehand::runner::{FailurePolicy, RunnerOptions, build_runner};
use stagehand::step::Step;

#[derive(Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Failure-policy supervisor for sequential build pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the pipeline described by a TOML file.
    Run {
        /// Pipeline file.
        #[arg(long, default_value = "pipeline.toml")]
        file: PathBuf,
        /// Override the configured failure policy (cleanup, abort, ask).
        #[arg(long)]
        on_error: Option<String>,
        /// Pause for the operator between steps.
        #[arg(long)]
        debug: bool,
        /// Override the automatic retry budget per step.
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Validate a pipeline file without running it.
    Check {
        /// Pipeline file.
        #[arg(long, default_value = "pipeline.toml")]
        file: PathBuf,
    },
}

fn main() {
    stagehand::logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run {
            file,
            on_error,
            debug,
            max_retries,
        } => cmd_run(&file, on_error.as_deref(), debug, max_retries),
        Command::Check { file } => {
            load_config(&file)?;
            println!("{} is valid", file.display());
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_run(
    file: &Path,
    on_error: Option<&str>,
    debug: bool,
    max_retries: Option<u32>,
) -> Result<i32> {
    let config = load_config(file)?;

    let ctx = RunContext::new();
    ctx.set_max_step_retries(max_retries.unwrap_or(config.max_step_retries));

    let steps: Vec<Box<dyn Step>> = config
        .step
        .iter()
        .map(|spec| Box::new(CommandStep::from_spec(spec)) as Box<dyn Step>)
        .collect();

    let options = RunnerOptions {
        on_error: FailurePolicy::parse(on_error.unwrap_or(&config.on_error)),
        debug: debug || config.debug,
    };
    let ui: Arc<dyn Ui> = Arc::new(ConsoleUi);

    let mut runner = build_runner(steps, &options, ui, &ctx);
    if runner.run(&ctx) {
        Ok(exit_codes::OK)
    } else if ctx.is_aborted() {
        Ok(exit_codes::ABORTED)
    } else {
        Ok(exit_codes::FAILED)
    }
}
