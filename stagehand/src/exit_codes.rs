//! Stable exit codes for the stagehand CLI.

/// Pipeline completed; every step continued.
pub const OK: i32 = 0;
/// Invalid configuration or CLI usage.
pub const INVALID: i32 = 1;
/// Pipeline halted on a step failure (cleanup policy applied).
pub const FAILED: i32 = 2;
/// Operator chose abort-without-cleanup.
pub const ABORTED: i32 = 3;
