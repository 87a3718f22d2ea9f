//! Exit codes for the CLI

/// Success, including runs where some apps were skipped
pub const SUCCESS: i32 = 0;

/// No usable credentials for any backend
pub const CONFIG_ERROR: i32 = 2;
