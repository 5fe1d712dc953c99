/// Maximum depth of the session hierarchy. A root session has depth 0.
pub const MAX_HIERARCHY_DEPTH: usize = 5;

/// Age under which a hook record is authoritative (seconds).
pub const HOOK_FRESH_SECS: u64 = 15;

/// Age under which a hook record is still usable but stale (seconds).
pub const HOOK_STALE_SECS: u64 = 120;

/// Consecutive no-confidence reads before a session is marked unreachable.
pub const UNCONFIDENT_STREAK_LIMIT: u32 = 3;

/// Default monitor loop interval (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Bounds for the monitor loop interval (seconds).
pub const MIN_POLL_INTERVAL_SECS: u64 = 2;
pub const MAX_POLL_INTERVAL_SECS: u64 = 10;

/// Number of pane lines captured for detection.
pub const DEFAULT_CAPTURE_LINES: usize = 200;

/// Done/terminated sessions older than this are archived (seconds).
pub const DEFAULT_ARCHIVE_AFTER_SECS: u64 = 3600;

/// Poll interval used by follow (milliseconds).
pub const DEFAULT_FOLLOW_POLL_MS: u64 = 500;

/// Environment variable carrying a launched agent's own session name.
pub const SESSION_NAME_ENV: &str = "SHEPHERD_SESSION_NAME";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "SHEPHERD_STATE_DIR";

/// Exit codes for follow and launch --follow.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const TIMEOUT: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}
