//! List command - the session tree with status, spend and budget

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use super::common::{colored_lifecycle, colored_status, format_ms, format_usd, load_context};
use crate::error::PolicyError;
use crate::fs::{Registry, SessionMap};
use crate::oversight::hierarchy::{is_ancestor, tree_order};

/// Tree rows for every session, or for `root` and its descendants.
pub fn tree_rows(sessions: &SessionMap, root: Option<&str>) -> Result<Vec<(String, usize)>> {
    let rows = tree_order(sessions);
    let Some(root) = root else {
        return Ok(rows);
    };
    if !sessions.contains_key(root) {
        return Err(PolicyError::UnknownSession(root.to_string()).into());
    }
    Ok(rows
        .into_iter()
        .filter(|(name, _)| name == root || is_ancestor(sessions, root, name))
        .collect())
}

pub fn execute(name: Option<String>) -> Result<()> {
    let (state, _) = load_context()?;
    let sessions = Registry::new(state).load()?;

    if sessions.is_empty() {
        println!("{} No sessions", "─".dimmed());
        return Ok(());
    }

    let now = Utc::now();
    for (name, depth) in tree_rows(&sessions, name.as_deref())? {
        let Some(session) = sessions.get(&name) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        let branch = if depth > 0 { "└─ " } else { "" };
        let since = format_ms((now - session.status_since).num_milliseconds());
        let budget = match session.effective_budget() {
            Some(budget) => format!("{} / {}", format_usd(session.spend_usd), format_usd(budget)),
            None => format_usd(session.spend_usd),
        };

        let mut flags = Vec::new();
        if session.asleep {
            flags.push("asleep".dimmed().to_string());
        }
        if session.budget_exceeded() {
            flags.push("over budget".red().to_string());
        }
        if session.heartbeat_armed() {
            flags.push("♥".magenta().to_string());
        }

        println!(
            "{indent}{branch}{}  {} ({since})  {}  {}  {}",
            name.bold(),
            colored_status(session.status),
            colored_lifecycle(session.lifecycle),
            budget,
            flags.join(" ")
        );
    }
    Ok(())
}
