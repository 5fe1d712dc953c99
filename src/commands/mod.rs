//! Command implementations behind the CLI.
//!
//! Commands print user-facing output and return `Result`. The two blocking
//! commands (`follow`, `launch --follow`) return the follow exit code.

pub mod budget;
pub mod common;
pub mod daemon;
pub mod follow;
pub mod hook;
pub mod kill;
pub mod launch;
pub mod list;
pub mod policy;
pub mod report;
pub mod send;
pub mod status;
