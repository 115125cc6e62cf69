//! Stable exit codes for the validator CLI.

/// Every check passed or was skipped.
pub const OK: i32 = 0;
/// The run could not complete: invalid configuration, unwritable output directory, or similar.
pub const INVALID: i32 = 1;
/// The run completed and at least one check failed.
pub const FAILED: i32 = 2;
