//! Side-effecting collaborators: terminal UI, configuration, command steps.

pub mod command_step;
pub mod config;
pub mod process;
pub mod ui;
