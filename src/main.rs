mod cli;

use clap::Parser;
use colored::Colorize;

use cli::{dispatch, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Daemon { .. } => "info",
        _ => "warn",
    };
    shepherd::logging::init(default_level);

    let code = match dispatch(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            1
        }
    };
    std::process::exit(code);
}
