//! Process host abstraction
//!
//! The supervisor never talks to a terminal multiplexer directly; everything
//! goes through [`ProcessHost`]. [`TmuxHost`] is the real backend and
//! [`ScriptedHost`] an in-memory one for tests and dry runs.

pub mod scripted;
pub mod tmux;

use anyhow::Result;
use std::path::Path;

use crate::models::session::WindowHandle;

pub use scripted::ScriptedHost;
pub use tmux::TmuxHost;

/// Window-level operations the supervisor needs from its host.
///
/// Every method returns an error instead of panicking when the host is
/// unreachable. Sends to one window are not reentrant; callers serialize
/// them per session.
pub trait ProcessHost: Send + Sync {
    /// Create a detached window named `name` starting in `dir`.
    fn create_window(&self, name: &str, dir: &Path) -> Result<WindowHandle>;

    /// Last `max_lines` lines of the window's visible text.
    fn capture_text(&self, handle: &WindowHandle, max_lines: usize) -> Result<String>;

    /// Type `text` literally, then press Enter if asked.
    fn send_keys(&self, handle: &WindowHandle, text: &str, press_enter: bool) -> Result<()>;

    /// Windows currently alive in the host.
    fn list_windows(&self) -> Result<Vec<WindowHandle>>;

    fn kill_window(&self, handle: &WindowHandle) -> Result<()>;
}

/// Send through `host` while holding the per-session send lock at `lock_path`.
pub fn send_serialized(
    host: &dyn ProcessHost,
    lock_path: &Path,
    handle: &WindowHandle,
    text: &str,
    press_enter: bool,
) -> Result<()> {
    let _guard = crate::fs::locking::FileLock::acquire(lock_path)?;
    host.send_keys(handle, text, press_enter)
}
