//! Stable exit codes for the CLI.

/// The run completed and printed a summary report.
pub const OK: i32 = 0;
/// The run failed: invalid config, sandbox provisioning, generation failure.
pub const INVALID: i32 = 1;
/// The run gave up after a node exhausted its attempt budget.
pub const GAVE_UP: i32 = 3;
