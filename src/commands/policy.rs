//! Per-session policy commands: heartbeat, priority, sleep, wake, oversight

use anyhow::Result;
use colored::Colorize;

use super::common::controller;
use crate::models::oversight::OversightPolicy;

pub fn heartbeat_set(name: String, interval_secs: u64, instruction: String) -> Result<()> {
    let controller = controller()?;
    controller.set_heartbeat(&name, interval_secs, &instruction)?;
    println!(
        "{} Heartbeat for '{name}' every {interval_secs}s",
        "✓".green().bold()
    );
    Ok(())
}

pub fn heartbeat_pause(name: String, paused: bool) -> Result<()> {
    let controller = controller()?;
    let session = controller.pause_heartbeat(&name, paused)?;
    let verb = if paused { "paused" } else { "resumed" };
    println!("{} Heartbeat for '{name}' {verb}", "✓".green().bold());
    if !paused && !session.heartbeat_armed() {
        println!(
            "  {} no interval/instruction configured, nothing will fire",
            "!".yellow()
        );
    }
    Ok(())
}

pub fn heartbeat_clear(name: String) -> Result<()> {
    let controller = controller()?;
    controller.clear_heartbeat(&name)?;
    println!("{} Heartbeat for '{name}' cleared", "✓".green().bold());
    Ok(())
}

pub fn priority(name: String, priority: i32) -> Result<()> {
    let controller = controller()?;
    controller.set_priority(&name, priority)?;
    println!("{} Priority of '{name}' set to {priority}", "✓".green().bold());
    Ok(())
}

pub fn sleep(name: String, asleep: bool) -> Result<()> {
    let controller = controller()?;
    controller.set_asleep(&name, asleep)?;
    if asleep {
        println!("{} '{name}' is asleep", "✓".green().bold());
    } else {
        println!("{} '{name}' is awake", "✓".green().bold());
    }
    Ok(())
}

pub fn oversight(name: String, policy: OversightPolicy) -> Result<()> {
    let controller = controller()?;
    controller.set_oversight(&name, policy)?;
    println!("{} Oversight for '{name}': {policy}", "✓".green().bold());
    Ok(())
}
