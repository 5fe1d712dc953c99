//! Shared helpers for command implementations.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use std::sync::Arc;

use crate::config::Settings;
use crate::fs::StateDir;
use crate::host::TmuxHost;
use crate::models::status::{AgentStatus, Lifecycle};
use crate::oversight::Controller;

/// Resolve and create the state directory, then load its settings.
pub fn load_context() -> Result<(StateDir, Settings)> {
    let state = StateDir::resolve()?;
    state.ensure()?;
    let settings = Settings::load(&state)?;
    Ok((state, settings))
}

/// Controller over the tmux host named in the settings.
pub fn controller() -> Result<Controller> {
    let (state, settings) = load_context()?;
    let host = TmuxHost::new(settings.tmux_session.clone())?;
    Ok(Controller::new(state, Arc::new(host), settings))
}

pub fn format_usd(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Compact duration: `45s`, `12m`, `3h05m`.
pub fn format_ms(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn colored_status(status: AgentStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        AgentStatus::Active => label.green(),
        AgentStatus::IdleNoPolicy => label.red(),
        AgentStatus::IdleAwaitingSupervisor => label.cyan(),
        AgentStatus::IdleAwaitingHuman => label.yellow(),
        AgentStatus::IdleAwaitingCompletionReport => label.magenta(),
        AgentStatus::Terminated => label.dimmed(),
        AgentStatus::Unreachable => label.red().bold(),
    }
}

pub fn colored_lifecycle(lifecycle: Lifecycle) -> ColoredString {
    let label = lifecycle.to_string();
    match lifecycle {
        Lifecycle::Running => label.normal(),
        Lifecycle::Done => label.green(),
        Lifecycle::Terminated => label.dimmed(),
    }
}
