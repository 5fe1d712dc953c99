//! Helper functions for tmux invocations

use anyhow::{anyhow, bail, Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

use super::types::{
    TmuxOutput, TMUX_COMMAND_TIMEOUT, TMUX_ENTER_RETRY_ATTEMPTS, TMUX_ENTER_RETRY_DELAY_MS,
};

/// Check if tmux is available on the system
pub fn check_tmux_available() -> Result<()> {
    if which::which("tmux").is_err() {
        return Err(anyhow!(
            "tmux is not installed. Please install tmux to supervise agents.\n\
             On Ubuntu/Debian: sudo apt-get install tmux\n\
             On macOS: brew install tmux\n\
             On Arch: sudo pacman -S tmux"
        ));
    }
    Ok(())
}

/// Run tmux with `args`, killing it if it outlives [`TMUX_COMMAND_TIMEOUT`].
pub fn run_tmux(args: &[&str]) -> Result<TmuxOutput> {
    run_tmux_with_timeout(args, TMUX_COMMAND_TIMEOUT)
}

pub fn run_tmux_with_timeout(args: &[&str], timeout: Duration) -> Result<TmuxOutput> {
    let mut child = Command::new("tmux")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run tmux {}", args.first().unwrap_or(&"")))?;

    // Drain pipes on threads so a chatty command cannot block on a full pipe.
    let (stdout_tx, stdout_rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            let _ = stdout_tx.send(buf);
        });
    } else {
        let _ = stdout_tx.send(String::new());
    }
    let (stderr_tx, stderr_rx) = mpsc::channel();
    if let Some(mut stderr) = child.stderr.take() {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            let _ = stderr_tx.send(buf);
        });
    } else {
        let _ = stderr_tx.send(String::new());
    }

    let status = child
        .wait_timeout(timeout)
        .context("Failed to wait for tmux")?;
    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        bail!("tmux {} timed out after {:?}", args.join(" "), timeout);
    };

    let stdout = stdout_rx.recv_timeout(timeout).unwrap_or_default();
    let stderr = stderr_rx.recv_timeout(timeout).unwrap_or_default();
    Ok(TmuxOutput {
        success: status.success(),
        stdout,
        stderr,
    })
}

/// Run tmux and fail with its stderr if it exits non-zero.
pub fn run_tmux_checked(args: &[&str], what: &str) -> Result<String> {
    let output = run_tmux(args)?;
    if !output.success {
        bail!("Failed to {what}: {}", output.stderr.trim());
    }
    Ok(output.stdout)
}

/// Send keys to tmux with debouncing (gastown pattern)
pub fn send_keys_debounced(target: &str, text: &str, debounce_ms: u64) -> Result<()> {
    send_literal(target, text)?;
    std::thread::sleep(Duration::from_millis(debounce_ms));
    send_enter_with_retry(target, TMUX_ENTER_RETRY_ATTEMPTS, TMUX_ENTER_RETRY_DELAY_MS)
}

/// Type `text` without interpreting key names.
pub fn send_literal(target: &str, text: &str) -> Result<()> {
    run_tmux_checked(&["send-keys", "-t", target, "-l", text], "send text")?;
    Ok(())
}

/// Send Enter key with retry logic (gastown pattern)
fn send_enter_with_retry(target: &str, attempts: u32, retry_delay_ms: u64) -> Result<()> {
    for attempt in 1..=attempts {
        let output = run_tmux(&["send-keys", "-t", target, "Enter"])?;
        if output.success {
            return Ok(());
        }
        if attempt < attempts {
            std::thread::sleep(Duration::from_millis(retry_delay_ms));
        }
    }
    bail!("Failed to send Enter after {attempts} attempts")
}

/// Window ids from `list-windows -F '#{window_id}'` output.
pub fn parse_window_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('@'))
        .map(str::to_string)
        .collect()
}
