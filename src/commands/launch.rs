//! Launch command - start a supervised agent, optionally following it

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use super::common::{controller, format_usd};
use super::follow::follow_session;
use crate::models::constants::SESSION_NAME_ENV;
use crate::models::oversight::OversightPolicy;
use crate::models::session::HeartbeatPolicy;
use crate::oversight::LaunchRequest;

/// Parsed `launch` arguments
#[derive(Debug, Clone, Default)]
pub struct LaunchArgs {
    pub name: String,
    pub directory: Option<PathBuf>,
    pub prompt: Option<String>,
    pub parent: Option<String>,
    pub budget: Option<f64>,
    pub oversight: Option<OversightPolicy>,
    pub heartbeat_secs: Option<u64>,
    pub heartbeat_instruction: Option<String>,
    pub priority: i32,
    pub follow: bool,
}

/// Parent for a new session: the explicit one, else the launching agent.
pub fn resolve_parent(explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| {
        std::env::var(SESSION_NAME_ENV)
            .ok()
            .filter(|name| !name.trim().is_empty())
    })
}

/// Returns the process exit code: 0 without `--follow`, else the follow code.
pub fn execute(args: LaunchArgs) -> Result<i32> {
    let controller = controller()?;

    let working_dir = match args.directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let mut request = LaunchRequest::new(args.name.clone(), working_dir);
    request.prompt = args.prompt.clone();
    request.parent = resolve_parent(args.parent);
    request.budget_usd = args.budget;
    request.oversight = args.oversight.unwrap_or_default();
    request.priority = args.priority;
    request.heartbeat = HeartbeatPolicy {
        interval_secs: args.heartbeat_secs,
        instruction: args.heartbeat_instruction,
        ..Default::default()
    };

    let session = controller.launch(request)?;

    println!("{} Agent '{}' launched", "✓".green().bold(), session.name.bold());
    println!("  Window:  {}", session.window);
    if let Some(parent) = &session.parent {
        println!("  Parent:  {parent}");
    }
    if args.prompt.is_some() {
        println!("  Initial prompt sent");
    }
    if let Some(budget) = session.budget_usd {
        println!("  Budget:  {}", format_usd(budget));
    }
    if session.oversight != OversightPolicy::Wait {
        println!("  Oversight: {}", session.oversight);
    }

    if !args.follow {
        return Ok(0);
    }
    println!();
    follow_session(&controller, &session.name, None)
}
