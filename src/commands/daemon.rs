//! Daemon commands: start, stop, status, run

use anyhow::{Context, Result};
use colored::Colorize;

use super::common::load_context;
use crate::daemon::{DaemonServer, DaemonStatus};

pub fn start() -> Result<()> {
    let (state, settings) = load_context()?;
    if let DaemonStatus::Running { pid } = DaemonServer::check_status(&state) {
        println!("{} Monitor daemon already running (pid {pid})", "─".dimmed());
        return Ok(());
    }

    println!("{} Starting monitor daemon...", "→".cyan().bold());
    let server = DaemonServer::new(state.clone(), settings);
    server.start().context("Failed to start monitor daemon")?;

    let pid = DaemonServer::read_pid(&state).unwrap_or_default();
    println!("{} Monitor daemon started (pid {pid})", "✓".green().bold());
    println!("  Log: {}", state.log_file().display());
    Ok(())
}

pub fn run() -> Result<()> {
    let (state, settings) = load_context()?;
    DaemonServer::new(state, settings).run_foreground()
}

pub fn stop() -> Result<()> {
    let (state, _) = load_context()?;
    if !DaemonServer::is_running(&state) {
        println!("{} Daemon is not running", "─".dimmed());
        return Ok(());
    }

    println!("{} Stopping daemon...", "→".cyan().bold());
    let pid = DaemonServer::stop(&state).context("Failed to stop daemon")?;
    println!("{} Daemon stopped (pid {pid})", "✓".green().bold());
    Ok(())
}

pub fn status() -> Result<()> {
    let (state, _) = load_context()?;
    match DaemonServer::check_status(&state) {
        DaemonStatus::Running { pid } => {
            println!("{} Monitor daemon running (pid {pid})", "✓".green().bold())
        }
        DaemonStatus::NotRunning => println!("{} Monitor daemon not running", "─".dimmed()),
    }
    Ok(())
}
