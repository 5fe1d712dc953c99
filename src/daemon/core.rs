//! Core DaemonServer struct, pid bookkeeping and status checks.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Settings;
use crate::fs::StateDir;

/// Whether a monitor daemon owns the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    NotRunning,
    Running { pid: u32 },
}

/// The monitor daemon for one state directory.
pub struct DaemonServer {
    pub(super) state: StateDir,
    pub(super) settings: Settings,
    pub(super) pid_path: PathBuf,
    pub(super) log_path: PathBuf,
    pub(super) shutdown_flag: Arc<AtomicBool>,
}

impl DaemonServer {
    pub fn new(state: StateDir, settings: Settings) -> Self {
        Self {
            pid_path: state.pid_file(),
            log_path: state.log_file(),
            state,
            settings,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check the pid file against the process table. A pid file naming a
    /// dead process is removed.
    pub fn check_status(state: &StateDir) -> DaemonStatus {
        let Some(pid) = Self::read_pid(state) else {
            return DaemonStatus::NotRunning;
        };
        if is_process_alive(pid) {
            DaemonStatus::Running { pid }
        } else {
            let _ = std::fs::remove_file(state.pid_file());
            DaemonStatus::NotRunning
        }
    }

    pub fn is_running(state: &StateDir) -> bool {
        matches!(Self::check_status(state), DaemonStatus::Running { .. })
    }

    /// `Some(pid)` if the pid file exists and holds a valid pid.
    pub fn read_pid(state: &StateDir) -> Option<u32> {
        std::fs::read_to_string(state.pid_file())
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
    }

    /// Request graceful shutdown of the monitor loop.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }
}

/// Probe `pid` with the null signal. EPERM still means the process exists.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
