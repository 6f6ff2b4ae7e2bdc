//! Stable exit codes for deployctl commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed (configuration, capability, collaborator or per-app
/// failures, including failures already reported to the user).
pub const FAILURE: i32 = 1;
/// Malformed input: misplaced flags, bad targets, ambiguous app selection.
pub const INVALID_INPUT: i32 = 2;
