//! Kill command - terminate a session, by default with its descendants

use anyhow::Result;
use colored::Colorize;

use super::common::controller;

pub fn execute(name: String, cascade: bool) -> Result<()> {
    let controller = controller()?;

    println!("{} Killing '{}'...", "→".cyan().bold(), name);
    let outcome = controller.kill(&name, cascade)?;

    for victim in &outcome.killed {
        println!("  {} {victim}", "✗".red());
    }
    for orphan in &outcome.orphaned {
        println!("  {} {orphan} is now a root session", "─".dimmed());
    }
    println!(
        "{} Killed {} session{}",
        "✓".green().bold(),
        outcome.killed.len(),
        if outcome.killed.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
