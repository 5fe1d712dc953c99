use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shepherd::models::oversight::OversightPolicy;

const HELP_TEMPLATE: &str = "
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}";

fn parse_policy(raw: &str) -> Result<OversightPolicy, String> {
    raw.parse().map_err(|e: anyhow::Error| e.to_string())
}

#[derive(Parser)]
#[command(name = "shepherd")]
#[command(about = "Supervisor for interactive agent sessions hosted in tmux", long_about = None)]
#[command(version)]
#[command(help_template = HELP_TEMPLATE)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch a new agent in its own tmux window
    Launch {
        /// Session name (letters, digits, '-', '_', '.'; max 64 characters)
        name: String,

        /// Working directory (defaults to the current directory)
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Initial prompt passed to the agent
        #[arg(short, long)]
        prompt: Option<String>,

        /// Parent session (defaults to the launching agent, if any)
        #[arg(long)]
        parent: Option<String>,

        /// Spend budget in USD
        #[arg(long)]
        budget: Option<f64>,

        /// Policy when the agent stops without reporting: wait, fail, timeout:<duration>
        #[arg(long = "on-stuck", value_parser = parse_policy)]
        on_stuck: Option<OversightPolicy>,

        /// Heartbeat interval in seconds (requires --heartbeat-instruction)
        #[arg(long, requires = "heartbeat_instruction")]
        heartbeat: Option<u64>,

        /// Instruction sent on every heartbeat
        #[arg(long, requires = "heartbeat")]
        heartbeat_instruction: Option<String>,

        /// Display priority
        #[arg(long, default_value_t = 0)]
        priority: i32,

        /// Stream output and block until the agent resolves (exit 0/1/2/130)
        #[arg(short, long)]
        follow: bool,
    },

    /// Kill a session and, unless --no-cascade, all its descendants
    Kill {
        name: String,

        /// Only kill this session; its children become roots
        #[arg(long)]
        no_cascade: bool,
    },

    /// Stream a session and block until it reports (exit 0/1/2/130)
    Follow {
        name: String,

        /// Override the session's oversight policy for this follow
        #[arg(long = "on-stuck", value_parser = parse_policy)]
        on_stuck: Option<OversightPolicy>,
    },

    /// Report completion of the calling agent (run inside a launched agent)
    Report {
        /// success or failure
        #[arg(long, short)]
        status: String,

        /// Optional reason
        #[arg(long, short)]
        reason: Option<String>,
    },

    /// Type text into a session's window
    Send {
        name: String,

        /// Text to send
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,

        /// Do not press Enter after the text
        #[arg(long)]
        no_enter: bool,
    },

    /// Show the session tree
    List {
        /// Limit to this session and its descendants
        name: Option<String>,
    },

    /// Summarize the latest monitor snapshot
    Status,

    /// Manage spend budgets
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },

    /// Manage heartbeat instructions
    Heartbeat {
        #[command(subcommand)]
        command: HeartbeatCommands,
    },

    /// Set a session's display priority
    Priority { name: String, priority: i32 },

    /// Exclude a session from time accounting and automation
    Sleep { name: String },

    /// Undo sleep
    Wake { name: String },

    /// Set a session's oversight policy: wait, fail, timeout:<duration>
    Oversight {
        name: String,
        #[arg(value_parser = parse_policy)]
        policy: OversightPolicy,
    },

    /// Control the monitor daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    /// Hook handler invoked by the agent runtime (reads JSON on stdin)
    #[command(hide = true)]
    Hook,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set a session's budget in USD (0 clears it)
    Set { name: String, amount: f64 },

    /// Move budget from an ancestor to a descendant
    Transfer {
        source: String,
        target: String,
        amount: f64,
    },

    /// Show budgets, spend and subtree spend
    Show { name: Option<String> },
}

#[derive(Subcommand)]
pub enum HeartbeatCommands {
    /// Configure the heartbeat
    Set {
        name: String,

        /// Interval in seconds
        #[arg(long, short)]
        interval: u64,

        /// Instruction to send
        instruction: String,
    },

    /// Pause without losing the configuration
    Pause { name: String },

    /// Resume a paused heartbeat
    Resume { name: String },

    /// Remove the heartbeat
    Clear { name: String },
}

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Start the monitor daemon in the background
    Start,

    /// Stop the running daemon
    Stop,

    /// Show whether the daemon is running
    Status,

    /// Run the monitor loop in the foreground
    Run,
}
