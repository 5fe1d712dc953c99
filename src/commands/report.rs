//! Report command - the completion handshake, run from inside an agent

use anyhow::Result;
use colored::Colorize;

use super::common::controller;
use crate::models::oversight::ReportStatus;

pub fn execute(status: String, reason: Option<String>) -> Result<()> {
    let controller = controller()?;
    let (name, report) = controller.report_self(&status, reason)?;

    let marker = match report.status {
        ReportStatus::Success => "✓".green().bold(),
        ReportStatus::Failure => "✗".red().bold(),
    };
    if report.reason.is_empty() {
        println!("{marker} '{name}' reported {}", report.status);
    } else {
        println!("{marker} '{name}' reported {}: {}", report.status, report.reason);
    }
    Ok(())
}
