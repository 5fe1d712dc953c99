//! Daemon lifecycle: start, run, stop.

use anyhow::{bail, Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{fork, setsid, ForkResult, Pid};
use std::fs::{self, File};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use super::core::{is_process_alive, DaemonServer, DaemonStatus};
use crate::fs::StateDir;
use crate::host::TmuxHost;
use crate::monitor::Monitor;

/// How long `start` waits for the daemon to write its pid file.
const START_WAIT: Duration = Duration::from_secs(3);

/// How long `stop` waits for the daemon to exit after SIGTERM.
const STOP_WAIT: Duration = Duration::from_secs(5);

const POLL: Duration = Duration::from_millis(100);

impl DaemonServer {
    /// Daemonize and run the monitor loop in the grandchild.
    ///
    /// Returns in the calling process once the daemon has written its pid
    /// file. The daemon process itself never returns from here.
    pub fn start(&self) -> Result<()> {
        if let DaemonStatus::Running { pid } = Self::check_status(&self.state) {
            bail!("Monitor daemon already running (pid {pid})");
        }
        self.state.ensure()?;

        match unsafe { fork() }.context("First fork failed")? {
            ForkResult::Parent { child } => {
                // The intermediate child exits right after the second fork.
                let _ = waitpid(child, None);
                return self.wait_for_start();
            }
            ForkResult::Child => {}
        }

        // Detach from the controlling terminal
        setsid().context("setsid failed")?;

        match unsafe { fork() }.context("Second fork failed")? {
            ForkResult::Parent { .. } => std::process::exit(0),
            ForkResult::Child => {}
        }

        fs::write(&self.pid_path, format!("{}", std::process::id()))
            .context("Failed to write PID file")?;

        let log_file = File::options()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .context("Failed to open daemon log")?;
        let log_fd = log_file.as_raw_fd();

        // Close stdin and redirect stdout/stderr to the log file
        unsafe {
            libc::close(0);
            if libc::dup2(log_fd, 1) < 0 {
                bail!("Failed to redirect stdout");
            }
            if libc::dup2(log_fd, 2) < 0 {
                bail!("Failed to redirect stderr");
            }
        }

        let code = match self.run_monitor() {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %format!("{e:#}"), "monitor daemon failed");
                1
            }
        };
        std::process::exit(code);
    }

    /// Run the monitor loop in this process until SIGINT or SIGTERM.
    pub fn run_foreground(&self) -> Result<()> {
        if let DaemonStatus::Running { pid } = Self::check_status(&self.state) {
            bail!("Monitor daemon already running (pid {pid})");
        }
        self.state.ensure()?;
        fs::write(&self.pid_path, format!("{}", std::process::id()))
            .context("Failed to write PID file")?;
        self.run_monitor()
    }

    fn run_monitor(&self) -> Result<()> {
        let flag = self.shutdown_flag();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("Failed to install signal handler")?;

        let result = TmuxHost::new(self.settings.tmux_session.clone()).and_then(|host| {
            let mut monitor = Monitor::new(self.state.clone(), Arc::new(host), self.settings.clone())?;
            info!(
                pid = std::process::id(),
                state_dir = %self.state.root().display(),
                "monitor daemon started"
            );
            monitor.run(&self.shutdown_flag)
        });

        self.cleanup()?;
        result
    }

    fn wait_for_start(&self) -> Result<()> {
        let mut waited = Duration::ZERO;
        while waited < START_WAIT {
            if Self::is_running(&self.state) {
                return Ok(());
            }
            thread::sleep(POLL);
            waited += POLL;
        }
        bail!(
            "Monitor daemon did not start. See {}",
            self.log_path.display()
        )
    }

    /// Send SIGTERM to the running daemon and wait for it to exit.
    pub fn stop(state: &StateDir) -> Result<u32> {
        let pid = match Self::check_status(state) {
            DaemonStatus::Running { pid } => pid,
            DaemonStatus::NotRunning => bail!("Daemon is not running"),
        };
        let raw = i32::try_from(pid).context("PID out of range")?;
        kill(Pid::from_raw(raw), Signal::SIGTERM).context("Failed to signal daemon")?;

        let mut waited = Duration::ZERO;
        while is_process_alive(pid) {
            if waited >= STOP_WAIT {
                bail!(
                    "Daemon did not exit within {} seconds. Try: kill -9 {pid}",
                    STOP_WAIT.as_secs()
                );
            }
            thread::sleep(POLL);
            waited += POLL;
        }
        Ok(pid)
    }

    /// Remove the pid file if it is ours.
    pub(super) fn cleanup(&self) -> Result<()> {
        if Self::read_pid(&self.state) != Some(std::process::id()) {
            return Ok(());
        }
        if let Err(e) = fs::remove_file(&self.pid_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e).context("Failed to remove PID file");
            }
        }
        Ok(())
    }
}

impl Drop for DaemonServer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
