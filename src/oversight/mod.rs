//! Hierarchy and oversight controller
//!
//! Short-lived operations over the registry: launch, kill, follow, the
//! completion handshake, budget transfer and the policy setters. Each one
//! reads or mutates the registry through a transaction and never touches
//! the monitor's state.

mod budget;
mod follow;
pub mod hierarchy;
mod kill;
mod launch;
mod policy;
mod report;

#[cfg(test)]
mod tests;

use anyhow::Result;
use std::sync::Arc;

use crate::config::Settings;
use crate::fs::{HookStore, Registry, StateDir};
use crate::host::{send_serialized, ProcessHost};

pub use budget::{budget_lines, BudgetLine};
pub use follow::{FollowOptions, FollowOutcome, OversightRequest};
pub use kill::KillOutcome;
pub use launch::LaunchRequest;
pub use report::report_from_env;

pub struct Controller {
    state: StateDir,
    registry: Registry,
    hooks: HookStore,
    host: Arc<dyn ProcessHost>,
    settings: Settings,
}

impl Controller {
    pub fn new(state: StateDir, host: Arc<dyn ProcessHost>, settings: Settings) -> Self {
        Self {
            registry: Registry::new(state.clone()),
            hooks: HookStore::new(state.clone()),
            state,
            host,
            settings,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Send text to a session's window under its send lock.
    pub fn send(&self, name: &str, text: &str, press_enter: bool) -> Result<()> {
        let session = self.registry.require(name)?;
        send_serialized(
            self.host.as_ref(),
            &self.state.send_lock(name),
            &session.window,
            text,
            press_enter,
        )
    }
}
