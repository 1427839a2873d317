//! Stable exit codes for the agent CLI.

/// The run finished: answered, no answer, or step budget exhausted.
pub const OK: i32 = 0;
/// Missing prompt, invalid arguments or config, or missing credentials.
pub const INVALID: i32 = 1;
/// The model service failed mid-run.
pub const MODEL_FAILURE: i32 = 2;
