use std::time::Duration;

/// Debounce delay between sending text and Enter key (milliseconds)
pub const TMUX_DEBOUNCE_MS: u64 = 200;

/// Number of retry attempts for sending Enter key
pub const TMUX_ENTER_RETRY_ATTEMPTS: u32 = 3;

/// Delay between Enter key retry attempts (milliseconds)
pub const TMUX_ENTER_RETRY_DELAY_MS: u64 = 200;

/// Upper bound for a single tmux invocation
pub const TMUX_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured result of one tmux invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}
