use anyhow::Result;
use shepherd::commands::launch::LaunchArgs;
use shepherd::commands::{
    budget, daemon, follow, hook, kill, launch, list, policy, report, send, status,
};

use super::types::{BudgetCommands, Commands, DaemonCommands, HeartbeatCommands};

/// Commands without their own exit code exit 0 on success.
fn done(result: Result<()>) -> Result<i32> {
    result.map(|()| 0)
}

/// Run `command` and return the process exit code.
pub fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Launch {
            name,
            directory,
            prompt,
            parent,
            budget,
            on_stuck,
            heartbeat,
            heartbeat_instruction,
            priority,
            follow,
        } => launch::execute(LaunchArgs {
            name,
            directory,
            prompt,
            parent,
            budget,
            oversight: on_stuck,
            heartbeat_secs: heartbeat,
            heartbeat_instruction,
            priority,
            follow,
        }),
        Commands::Follow { name, on_stuck } => follow::execute(name, on_stuck),
        Commands::Kill { name, no_cascade } => done(kill::execute(name, !no_cascade)),
        Commands::Report { status, reason } => done(report::execute(status, reason)),
        Commands::Send {
            name,
            text,
            no_enter,
        } => done(send::execute(name, text, no_enter)),
        Commands::List { name } => done(list::execute(name)),
        Commands::Status => done(status::execute()),
        Commands::Budget { command } => done(match command {
            BudgetCommands::Set { name, amount } => budget::set(name, amount),
            BudgetCommands::Transfer {
                source,
                target,
                amount,
            } => budget::transfer(source, target, amount),
            BudgetCommands::Show { name } => budget::show(name),
        }),
        Commands::Heartbeat { command } => done(match command {
            HeartbeatCommands::Set {
                name,
                interval,
                instruction,
            } => policy::heartbeat_set(name, interval, instruction),
            HeartbeatCommands::Pause { name } => policy::heartbeat_pause(name, true),
            HeartbeatCommands::Resume { name } => policy::heartbeat_pause(name, false),
            HeartbeatCommands::Clear { name } => policy::heartbeat_clear(name),
        }),
        Commands::Priority { name, priority } => done(policy::priority(name, priority)),
        Commands::Sleep { name } => done(policy::sleep(name, true)),
        Commands::Wake { name } => done(policy::sleep(name, false)),
        Commands::Oversight { name, policy: p } => done(policy::oversight(name, p)),
        Commands::Daemon { command } => done(match command {
            DaemonCommands::Start => daemon::start(),
            DaemonCommands::Stop => daemon::stop(),
            DaemonCommands::Status => daemon::status(),
            DaemonCommands::Run => daemon::run(),
        }),
        Commands::Hook => done(hook::execute()),
    }
}
