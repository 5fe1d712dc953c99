//! Follow command - stream a session and block until it resolves

use anyhow::{Context, Result};
use colored::Colorize;
use std::io;
use std::sync::atomic::Ordering;

use super::common::controller;
use crate::models::oversight::OversightPolicy;
use crate::oversight::{Controller, FollowOptions, FollowOutcome};

pub fn execute(name: String, policy: Option<OversightPolicy>) -> Result<i32> {
    let controller = controller()?;
    follow_session(&controller, &name, policy)
}

/// Follow `name` on stdout until it resolves. Ctrl-C stops following
/// without touching the session.
pub fn follow_session(controller: &Controller, name: &str, policy: Option<OversightPolicy>) -> Result<i32> {
    let mut options = FollowOptions::new(controller.settings().follow_poll());
    options.policy = policy;

    let interrupt = options.interrupt.clone();
    ctrlc::set_handler(move || interrupt.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = controller.follow(name, &options, &mut out)?;
    drop(out);

    let marker = match &outcome {
        FollowOutcome::Success { .. } => "✓".green().bold(),
        FollowOutcome::Interrupted => "─".dimmed(),
        _ => "✗".red().bold(),
    };
    eprintln!("\n{marker} Agent '{name}' {outcome}");
    Ok(outcome.exit_code())
}
