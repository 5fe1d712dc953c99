//! Status command - summary of the last published monitor snapshot

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use super::common::{colored_status, format_ms, format_usd, load_context};
use crate::daemon::{DaemonServer, DaemonStatus};
use crate::fs::snapshot_store::load_snapshot;

pub fn execute() -> Result<()> {
    let (state, _) = load_context()?;

    match DaemonServer::check_status(&state) {
        DaemonStatus::Running { pid } => {
            println!("{} Monitor daemon running (pid {pid})", "✓".green().bold())
        }
        DaemonStatus::NotRunning => println!(
            "{} Monitor daemon not running (start with 'shepherd daemon start')",
            "─".dimmed()
        ),
    }

    let Some(snapshot) = load_snapshot(&state)? else {
        println!("{} No snapshot published yet", "─".dimmed());
        return Ok(());
    };

    let age = format_ms((Utc::now() - snapshot.published_at).num_milliseconds());
    println!(
        "Loop #{} published {age} ago",
        snapshot.loop_count
    );
    println!("─────────────────────────────────────────────────────────");

    let totals = &snapshot.totals;
    println!(
        "Sessions: {}  active: {}  asleep: {}",
        totals.sessions,
        totals.active.to_string().green(),
        totals.asleep
    );
    for (status, count) in &totals.by_status {
        println!("  {:<34} {count}", colored_status(*status));
    }
    println!(
        "Spend: {}  tokens: {}  active: {}  idle: {}",
        format_usd(totals.spend_usd),
        totals.tokens,
        format_ms(totals.active_ms),
        format_ms(totals.idle_ms)
    );

    if !snapshot.sessions.is_empty() {
        println!();
    }
    for session in &snapshot.sessions {
        let over = if session.budget_exceeded {
            " over budget".red().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<20} {:<34} {:>3}% active  {}{over}",
            session.name,
            colored_status(session.status),
            session.time.active_percent(),
            format_usd(session.spend_usd)
        );
    }
    Ok(())
}
