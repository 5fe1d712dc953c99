//! Send command - type text into a session's window

use anyhow::{bail, Result};
use colored::Colorize;

use super::common::controller;

pub fn execute(name: String, text: Vec<String>, no_enter: bool) -> Result<()> {
    let text = text.join(" ");
    if text.is_empty() && no_enter {
        bail!("Nothing to send");
    }
    let controller = controller()?;
    controller.send(&name, &text, !no_enter)?;
    println!("{} Sent to '{name}'", "✓".green().bold());
    Ok(())
}
