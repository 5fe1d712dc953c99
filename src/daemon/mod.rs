//! Monitor daemon process management.

mod core;
mod lifecycle;


pub use self::core::{is_process_alive, DaemonServer, DaemonStatus};
