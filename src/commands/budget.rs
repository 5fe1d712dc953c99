//! Budget commands: set, transfer, show

use anyhow::Result;
use colored::Colorize;

use super::common::{controller, format_usd, load_context};
use crate::fs::Registry;
use crate::oversight::budget_lines;

pub fn set(name: String, amount: f64) -> Result<()> {
    let controller = controller()?;
    let session = controller.set_budget(&name, amount)?;
    match session.budget_usd {
        Some(budget) => println!("{} Budget for '{name}' set to {}", "✓".green().bold(), format_usd(budget)),
        None => println!("{} Budget for '{name}' cleared", "✓".green().bold()),
    }
    Ok(())
}

pub fn transfer(source: String, target: String, amount: f64) -> Result<()> {
    let controller = controller()?;
    controller.transfer_budget(&source, &target, amount)?;
    println!(
        "{} Transferred {} from '{source}' to '{target}'",
        "✓".green().bold(),
        format_usd(amount)
    );
    Ok(())
}

pub fn show(name: Option<String>) -> Result<()> {
    let (state, _) = load_context()?;
    let sessions = Registry::new(state).load()?;
    let lines = budget_lines(&sessions, name.as_deref())?;

    if lines.is_empty() {
        println!("{} No sessions", "─".dimmed());
        return Ok(());
    }

    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10}",
        "SESSION", "BUDGET", "SPENT", "LEFT", "SUBTREE"
    );
    for line in lines {
        let budget = line.budget_usd.map_or_else(|| "-".to_string(), format_usd);
        let left = match line.remaining_usd {
            Some(left) if left <= 0.0 => format!("{:>10}", format_usd(left)).red().to_string(),
            Some(left) => format!("{:>10}", format_usd(left)),
            None => format!("{:>10}", "-"),
        };
        println!(
            "{:<20} {:>10} {:>10} {left} {:>10}",
            line.name,
            budget,
            format_usd(line.spend_usd),
            format_usd(line.subtree_spend_usd)
        );
    }
    Ok(())
}
