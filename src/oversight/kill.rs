use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{info, warn};

use super::hierarchy::{children_of, descendants_deepest_first};
use super::Controller;
use crate::error::PolicyError;
use crate::models::status::{AgentStatus, Lifecycle};

/// Result of a kill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillOutcome {
    /// Sessions terminated, in the order their windows were killed
    pub killed: Vec<String>,
    /// Direct children whose parent link was cleared
    pub orphaned: Vec<String>,
}

impl Controller {
    /// Terminate `name`.
    ///
    /// With `cascade`, every descendant goes first, deepest first, so no
    /// step targets a node already removed. Without it, direct children are
    /// orphaned before the target is terminated. Killed sessions move to the
    /// archive, so nothing left in the registry points at them.
    ///
    /// # Arguments
    ///
    /// * `name` - Session to terminate
    /// * `cascade` - Also terminate every descendant
    ///
    /// # Returns
    ///
    /// The kill order and any orphaned children. Nothing changes when the
    /// host cannot list its windows.
    pub fn kill(&self, name: &str, cascade: bool) -> Result<KillOutcome> {
        let live: HashSet<String> = self
            .host
            .list_windows()
            .context("Process host unreachable, nothing was killed")?
            .into_iter()
            .map(|w| w.id)
            .collect();

        let outcome = self.registry.transaction(|sessions| {
            if !sessions.contains_key(name) {
                return Err(PolicyError::UnknownSession(name.to_string()).into());
            }

            let mut outcome = KillOutcome::default();
            let mut order = if cascade {
                descendants_deepest_first(sessions, name)
            } else {
                let children = children_of(sessions, name);
                for child in &children {
                    if let Some(session) = sessions.get_mut(child) {
                        session.parent = None;
                    }
                }
                outcome.orphaned = children;
                Vec::new()
            };
            order.push(name.to_string());

            for victim in &order {
                let Some(session) = sessions.get_mut(victim) else {
                    continue;
                };
                if live.contains(&session.window.id) {
                    if let Err(e) = self.host.kill_window(&session.window) {
                        warn!(session = %victim, error = %e, "kill_window failed");
                    }
                }
                if session.lifecycle != Lifecycle::Terminated {
                    session.try_transition(Lifecycle::Terminated)?;
                }
                session.set_status(AgentStatus::Terminated, "killed", chrono::Utc::now());
                outcome.killed.push(victim.clone());
            }

            self.registry.archive_locked(sessions, &order)?;
            Ok(outcome)
        })?;

        for victim in &outcome.killed {
            if let Err(e) = self.hooks.clear(victim) {
                warn!(session = %victim, error = %e, "failed to clear hook record");
            }
        }
        info!(
            session = %name,
            killed = outcome.killed.len(),
            orphaned = outcome.orphaned.len(),
            "kill complete"
        );
        Ok(outcome)
    }
}
