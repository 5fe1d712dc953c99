pub mod commands;
pub mod config;
pub mod daemon;
pub mod detect;
pub mod error;
pub mod fs;
pub mod host;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod oversight;
