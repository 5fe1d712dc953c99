//! Monitor daemon: periodic detection, accounting and policy enforcement

pub mod accumulator;
pub mod archive;
mod core;
pub mod heartbeat;


pub use self::core::{IterationReport, Monitor};
